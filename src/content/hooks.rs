use crate::core::{Document, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Write operation a `before_change` hook is called for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookOperation {
    Create,
    Update,
}

impl fmt::Display for HookOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOperation::Create => f.write_str("create"),
            HookOperation::Update => f.write_str("update"),
        }
    }
}

/// Per-collection extension points of the write and read paths.
///
/// Both methods default to passing the document through. Errors returned
/// here fail the surrounding operation.
#[async_trait]
pub trait CollectionHooks: Send + Sync {
    /// Runs on incoming data before validation and persistence.
    async fn before_change(&self, data: Document, operation: HookOperation) -> Result<Document> {
        let _ = operation;
        Ok(data)
    }

    /// Runs on every document returned to a caller.
    async fn after_read(&self, document: Document) -> Result<Document> {
        Ok(document)
    }
}
