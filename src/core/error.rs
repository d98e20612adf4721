use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("Document '{id}' not found in '{collection}'")]
    DocumentNotFound { collection: String, id: String },

    #[error("Version '{0}' not found")]
    VersionNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Duplicate value {value} for unique field '{field}' in '{collection}'")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CmsError>;

impl CmsError {
    pub fn document_not_found(collection: &str, id: &str) -> Self {
        Self::DocumentNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CollectionNotFound(_) | Self::DocumentNotFound { .. } | Self::VersionNotFound(_)
        )
    }

    pub fn is_access(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::DuplicateKey { .. })
    }
}

impl From<serde_json::Error> for CmsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for CmsError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(format!("write task aborted: {}", err))
    }
}
