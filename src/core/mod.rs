pub mod error;
pub mod types;
pub mod value;

pub use error::{CmsError, Result};
pub use types::{
    CREATED_AT_FIELD, CREATED_BY_FIELD, Document, DocumentStatus, ID_FIELD, PUBLISHED_AT_FIELD,
    STATUS_FIELD, SYSTEM_FIELDS, UPDATED_AT_FIELD, document_id, new_document_id, now_timestamp,
};
