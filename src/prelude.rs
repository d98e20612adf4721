//! Everything an application needs to define collections and run content
//! operations.

pub use crate::access::Caller;
pub use crate::config::CmsConfig;
pub use crate::content::{
    CollectionHooks, ContentEngine, FindOneOptions, FindQuery, HookOperation, PaginatedDocuments,
    StatusFilter,
};
pub use crate::core::{CmsError, Document, DocumentStatus, Result};
pub use crate::facade::{Vertex, VertexBuilder};
pub use crate::locale::LocaleConfig;
pub use crate::metadata::{
    AccessRules, BlockDefinition, CollectionDefinition, FieldDefinition, FieldType, Operation,
    SelectOption,
};
