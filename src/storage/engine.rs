use super::query::{Filter, StoreQuery};
use crate::core::{Document, ID_FIELD, Result};
use crate::populate::PopulateStep;
use crate::registry::CollectionSchema;
use async_recursion::async_recursion;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Document store capability the content engine is built on.
///
/// Collections are addressed by name (the collection slug). Implementations
/// own id assignment, timestamps and unique-field enforcement, as described
/// by the `CollectionSchema` handed to `create_collection`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Register a collection model. Fails if the name is taken.
    async fn create_collection(&self, schema: CollectionSchema) -> Result<()>;

    async fn has_collection(&self, name: &str) -> bool;

    async fn list_collections(&self) -> Vec<String>;

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Document>>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Documents whose `_id` is in `ids`, in storage order. Unknown ids are
    /// skipped.
    async fn find_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<Document>>;

    /// Insert a document and return it as stored (with `_id` and timestamps).
    async fn insert(&self, collection: &str, document: Document) -> Result<Document>;

    /// Merge `changes` into the top level of the document. Returns `None`
    /// when the id does not exist.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>>;

    /// Remove a document, returning it if it existed.
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn delete_many(&self, collection: &str, ids: &[String]) -> Result<usize>;

    /// Replace reference tokens with the referenced documents, following a
    /// population plan. The default implementation joins through
    /// `find_by_ids`; stores with a native join can override it.
    async fn populate(
        &self,
        collection: &str,
        documents: Vec<Document>,
        plan: &[PopulateStep],
    ) -> Result<Vec<Document>> {
        let _ = collection;
        populate_by_reference(self, documents, plan).await
    }
}

/// Reference-following join used by the default `populate`.
///
/// A single reference that no longer resolves becomes `null`; dangling
/// entries of a many-reference are dropped.
#[async_recursion]
pub async fn populate_by_reference<S>(
    store: &S,
    mut documents: Vec<Document>,
    plan: &[PopulateStep],
) -> Result<Vec<Document>>
where
    S: DocumentStore + ?Sized,
{
    for step in plan {
        let ids = collect_reference_ids(&documents, &step.path);
        if ids.is_empty() {
            continue;
        }

        let targets = store.find_by_ids(&step.collection, &ids).await?;
        let targets = populate_by_reference(store, targets, &step.populate).await?;
        let by_id: HashMap<String, Document> = targets
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get(ID_FIELD)?.as_str()?.to_string();
                Some((id, doc))
            })
            .collect();

        for document in documents.iter_mut() {
            let Some(value) = document.get_mut(&step.path) else {
                continue;
            };
            *value = match std::mem::take(value) {
                Value::String(id) => by_id
                    .get(&id)
                    .map(|doc| Value::Object(doc.clone()))
                    .unwrap_or(Value::Null),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::String(id) => by_id.get(&id).map(|doc| Value::Object(doc.clone())),
                            other => Some(other),
                        })
                        .collect(),
                ),
                other => other,
            };
        }
    }
    Ok(documents)
}

fn collect_reference_ids(documents: &[Document], field: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: &str| {
        if !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    };
    for document in documents {
        match document.get(field) {
            Some(Value::String(id)) => push(id),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .for_each(&mut push),
            _ => {}
        }
    }
    ids
}
