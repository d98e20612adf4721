// ============================================================================
// Vertex CMS Library
// ============================================================================

pub mod access;
pub mod config;
pub mod content;
pub mod core;
pub mod facade;
pub mod locale;
pub mod metadata;
pub mod playground;
pub mod populate;
pub mod prelude;
pub mod registry;
pub mod storage;
pub mod versions;
pub mod web;

// Re-export main types for convenience
pub use access::Caller;
pub use config::CmsConfig;
pub use content::{ContentEngine, FindOneOptions, FindQuery, PaginatedDocuments};
pub use crate::core::{CmsError, Document, DocumentStatus, Result};
pub use facade::{Vertex, VertexBuilder};
pub use locale::LocaleConfig;
pub use registry::SchemaRegistry;
pub use storage::{DocumentStore, InMemoryDocumentStore};
pub use versions::{Version, VersionStore};
pub use web::ApiError;
