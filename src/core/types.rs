use super::{CmsError, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stored document: field name -> JSON value, system fields included.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const STATUS_FIELD: &str = "status";
pub const PUBLISHED_AT_FIELD: &str = "publishedAt";
pub const CREATED_BY_FIELD: &str = "createdBy";

/// Fields owned by the engine/store. Callers cannot write them directly.
pub const SYSTEM_FIELDS: [&str; 6] = [
    ID_FIELD,
    CREATED_AT_FIELD,
    UPDATED_AT_FIELD,
    STATUS_FIELD,
    PUBLISHED_AT_FIELD,
    CREATED_BY_FIELD,
];

/// Lifecycle state of a document in a drafts-enabled collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Published => "published",
            DocumentStatus::Archived => "archived",
        }
    }

    /// Reads the `status` system field of a document, if any.
    pub fn of(document: &Document) -> Option<Self> {
        document
            .get(STATUS_FIELD)
            .and_then(|value| value.as_str())
            .and_then(|raw| raw.parse().ok())
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = CmsError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "draft" => Ok(DocumentStatus::Draft),
            "published" => Ok(DocumentStatus::Published),
            "archived" => Ok(DocumentStatus::Archived),
            other => Err(CmsError::validation(format!(
                "unknown document status '{}'",
                other
            ))),
        }
    }
}

/// Opaque identifier handed out for new documents and versions.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// RFC 3339 timestamp with microsecond precision, UTC.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Returns the `_id` of a document as a string slice.
pub fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(|value| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trip_through_document() {
        let mut doc = Document::new();
        doc.insert(STATUS_FIELD.into(), json!("published"));
        assert_eq!(DocumentStatus::of(&doc), Some(DocumentStatus::Published));

        doc.insert(STATUS_FIELD.into(), json!("bogus"));
        assert_eq!(DocumentStatus::of(&doc), None);
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = new_document_id();
        let b = new_document_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
