use super::engine::DocumentStore;
use super::query::{Filter, StoreQuery};
use super::table::DocumentTable;
use crate::core::{CmsError, Document, Result};
use crate::registry::CollectionSchema;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local document store.
///
/// Every collection lives behind its own lock, so writers to one collection
/// never block readers of another.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    tables: RwLock<HashMap<String, Arc<RwLock<DocumentTable>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn table(&self, name: &str) -> Result<Arc<RwLock<DocumentTable>>> {
        self.tables
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| CmsError::CollectionNotFound(name.to_string()))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_collection(&self, schema: CollectionSchema) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&schema.name) {
            return Err(CmsError::Storage(format!(
                "collection '{}' already exists",
                schema.name
            )));
        }
        debug!(
            "creating collection '{}' ({} fields)",
            schema.name,
            schema.fields.len()
        );
        let name = schema.name.clone();
        tables.insert(name, Arc::new(RwLock::new(DocumentTable::new(schema))));
        Ok(())
    }

    async fn has_collection(&self, name: &str) -> bool {
        self.tables.read().await.contains_key(name)
    }

    async fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Document>> {
        let handle = self.table(collection).await?;
        let table = handle.read().await;

        let mut matched: Vec<(u64, &Document)> = table
            .scan()
            .filter(|(_, doc)| query.filter.matches(doc))
            .collect();
        matched.sort_by(|a, b| query.sort.compare(*a, *b));

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(query.skip)
            .take(limit)
            .map(|(_, doc)| query.apply_projection(doc))
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize> {
        let handle = self.table(collection).await?;
        let table = handle.read().await;
        if filter.is_empty() {
            return Ok(table.len());
        }
        Ok(table.scan().filter(|(_, doc)| filter.matches(doc)).count())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let handle = self.table(collection).await?;
        let table = handle.read().await;
        Ok(table.get(id).cloned())
    }

    async fn find_by_ids(&self, collection: &str, ids: &[String]) -> Result<Vec<Document>> {
        let handle = self.table(collection).await?;
        let table = handle.read().await;
        let mut found: Vec<(u64, Document)> = Vec::with_capacity(ids.len());
        for (seq, doc) in table.scan() {
            if crate::core::document_id(doc).is_some_and(|id| ids.iter().any(|want| want == id)) {
                found.push((seq, doc.clone()));
            }
        }
        Ok(found.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<Document> {
        let handle = self.table(collection).await?;
        let mut table = handle.write().await;
        let stored = table.insert(document)?;
        debug!("inserted document into '{}'", collection);
        Ok(stored)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>> {
        let handle = self.table(collection).await?;
        let mut table = handle.write().await;
        table.update(id, changes)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let handle = self.table(collection).await?;
        let mut table = handle.write().await;
        Ok(table.delete(id))
    }

    async fn delete_many(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let handle = self.table(collection).await?;
        let mut table = handle.write().await;
        let removed = ids.iter().filter(|id| table.delete(id).is_some()).count();
        if removed > 0 {
            debug!("removed {} documents from '{}'", removed, collection);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ID_FIELD;
    use crate::populate::PopulateStep;
    use crate::registry::{StorageField, StorageType};
    use crate::storage::query::Sort;
    use serde_json::{Value, json};

    fn schema(name: &str, fields: Vec<StorageField>) -> CollectionSchema {
        CollectionSchema {
            name: name.to_string(),
            fields,
            timestamps: false,
            drafts: false,
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn store_with_movies() -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        store
            .create_collection(schema(
                "movies",
                vec![
                    StorageField::new("title", StorageType::Text),
                    StorageField::new("year", StorageType::Number),
                ],
            ))
            .await
            .unwrap();
        for (title, year) in [("Alien", 1979), ("Heat", 1995), ("Arrival", 2016)] {
            store
                .insert("movies", doc(json!({"title": title, "year": year})))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_create_collection_twice_fails() {
        let store = InMemoryDocumentStore::new();
        store.create_collection(schema("a", vec![])).await.unwrap();
        assert!(store.create_collection(schema("a", vec![])).await.is_err());
        assert_eq!(store.list_collections().await, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = InMemoryDocumentStore::new();
        let err = store.find("nope", &StoreQuery::default()).await.unwrap_err();
        assert!(matches!(err, CmsError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_find_sort_skip_limit() {
        let store = store_with_movies().await;
        let query = StoreQuery::new(Filter::new())
            .sort(Sort::by("year", true))
            .skip(1)
            .limit(1);
        let docs = store.find("movies", &query).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["title"], json!("Heat"));
    }

    #[tokio::test]
    async fn test_natural_order_descending() {
        let store = store_with_movies().await;
        let query = StoreQuery::default().sort(Sort::Natural { descending: true });
        let titles: Vec<Value> = store
            .find("movies", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("Arrival"), json!("Heat"), json!("Alien")]);
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let store = store_with_movies().await;
        assert_eq!(store.count("movies", &Filter::new()).await.unwrap(), 3);
        let filter = Filter::new().contains(vec!["title".into()], "al");
        assert_eq!(store.count("movies", &filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = store_with_movies().await;
        let docs = store.find("movies", &StoreQuery::default()).await.unwrap();
        let id = docs[0][ID_FIELD].as_str().unwrap().to_string();

        let updated = store
            .update_by_id("movies", &id, doc(json!({"year": 1980})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["year"], json!(1980));
        assert_eq!(updated["title"], json!("Alien"));

        assert!(store.delete_by_id("movies", &id).await.unwrap().is_some());
        assert!(store.find_by_id("movies", &id).await.unwrap().is_none());
        assert_eq!(store.delete_many("movies", &[id]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_default_populate_joins_references() {
        let store = InMemoryDocumentStore::new();
        store
            .create_collection(schema("authors", vec![StorageField::new("name", StorageType::Text)]))
            .await
            .unwrap();
        store
            .create_collection(schema(
                "posts",
                vec![StorageField::new(
                    "author",
                    StorageType::Reference {
                        target: "authors".into(),
                        many: false,
                    },
                )],
            ))
            .await
            .unwrap();
        let author = store
            .insert("authors", doc(json!({"name": "Ada"})))
            .await
            .unwrap();
        let author_id = author[ID_FIELD].clone();
        let post = store
            .insert("posts", doc(json!({"author": author_id})))
            .await
            .unwrap();
        let dangling = store
            .insert("posts", doc(json!({"author": "missing"})))
            .await
            .unwrap();

        let plan = vec![PopulateStep::new("author", "authors", false)];
        let docs = store
            .populate("posts", vec![post, dangling], &plan)
            .await
            .unwrap();
        assert_eq!(docs[0]["author"]["name"], json!("Ada"));
        assert_eq!(docs[1]["author"], Value::Null);
    }
}
