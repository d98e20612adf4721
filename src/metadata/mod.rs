//! Metadata Model
//!
//! Plain data describing collections, fields and blocks. Definitions are
//! built by application code; the `*Metadata` types are what the schema
//! registry produces from them after resolving block references.

mod block;
mod collection;
mod field;

pub use block::{BlockDefinition, BlockMetadata};
pub use collection::{
    ADMIN_ROLE, AccessRules, CollectionDefinition, CollectionMetadata, Operation, PUBLIC_ROLE,
};
pub use field::{FieldDefinition, FieldMetadata, FieldType, SelectOption};
