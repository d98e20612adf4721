//! Document storage: the `DocumentStore` capability and its in-memory
//! implementation.

pub mod engine;
pub mod memory;
pub mod query;
pub mod table;

pub use engine::{DocumentStore, populate_by_reference};
pub use memory::InMemoryDocumentStore;
pub use query::{Condition, Filter, Sort, StoreQuery};
pub use table::DocumentTable;
