//! Version Store
//!
//! Append-only history of published documents, kept in the internal
//! `_versions` collection. Numbers grow per document and are never reused;
//! old entries are pruned in the background down to the owning collection's
//! `max_versions`.

use crate::core::{CREATED_AT_FIELD, CREATED_BY_FIELD, CmsError, Document, ID_FIELD, Result};
use crate::metadata::{AccessRules, CollectionDefinition, FieldDefinition};
use crate::registry::SchemaRegistry;
use crate::storage::{DocumentStore, Filter, Sort, StoreQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const VERSIONS_COLLECTION: &str = "_versions";

const COLLECTION_FIELD: &str = "collectionSlug";
const DOCUMENT_FIELD: &str = "documentId";
const NUMBER_FIELD: &str = "versionNumber";
const DATA_FIELD: &str = "data";
const LOCK_SHARDS: usize = 16;

/// Definition of the internal collection holding version snapshots.
pub fn version_collection() -> CollectionDefinition {
    CollectionDefinition::new("Version", VERSIONS_COLLECTION)
        .singular("Version")
        .plural("Versions")
        .timestamps(true)
        .drafts(false)
        .access(AccessRules::admin_only())
        .field(FieldDefinition::text(COLLECTION_FIELD).required())
        .field(FieldDefinition::text(DOCUMENT_FIELD).required())
        .field(FieldDefinition::number(NUMBER_FIELD).required())
        .field(FieldDefinition::text(DATA_FIELD).required())
}

/// An immutable snapshot of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(rename = "_id")]
    pub id: String,
    pub collection_slug: String,
    pub document_id: String,
    pub version_number: u64,
    pub data: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Version {
    /// Decodes a `_versions` row, whose payload is stored serialized.
    fn from_stored(stored: &Document) -> Result<Self> {
        let text = |field: &str| {
            stored
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| CmsError::Storage(format!("version row without '{}'", field)))
        };
        let data = match stored.get(DATA_FIELD) {
            Some(Value::String(raw)) => serde_json::from_str(raw)?,
            Some(Value::Object(map)) => map.clone(),
            _ => return Err(CmsError::Storage("version row without payload".into())),
        };
        Ok(Self {
            id: text(ID_FIELD)?,
            collection_slug: text(COLLECTION_FIELD)?,
            document_id: text(DOCUMENT_FIELD)?,
            version_number: stored
                .get(NUMBER_FIELD)
                .and_then(Value::as_u64)
                .unwrap_or_default(),
            data,
            created_by: text(CREATED_BY_FIELD).ok(),
            created_at: text(CREATED_AT_FIELD).ok(),
        })
    }
}

/// Creates, lists and prunes versions. Cheap to clone.
#[derive(Clone)]
pub struct VersionStore {
    store: Arc<dyn DocumentStore>,
    registry: Arc<SchemaRegistry>,
    /// Serializes number assignment per document; shard chosen by hash.
    locks: Arc<Vec<Mutex<()>>>,
}

impl VersionStore {
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            store,
            registry,
            locks: Arc::new((0..LOCK_SHARDS).map(|_| Mutex::new(())).collect()),
        }
    }

    fn lock_for(&self, slug: &str, document_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        (slug, document_id).hash(&mut hasher);
        &self.locks[(hasher.finish() as usize) % self.locks.len()]
    }

    fn max_versions(&self, slug: &str) -> Result<usize> {
        Ok(self.registry.require(slug)?.metadata.max_versions.max(1) as usize)
    }

    fn history_query(slug: &str, document_id: &str) -> StoreQuery {
        StoreQuery::new(
            Filter::new()
                .eq(COLLECTION_FIELD, slug)
                .eq(DOCUMENT_FIELD, document_id),
        )
        .sort(Sort::by(NUMBER_FIELD, true))
    }

    /// Writes the next version of a document, then schedules pruning.
    pub async fn create_version(
        &self,
        slug: &str,
        document_id: &str,
        document: &Document,
        author: Option<&str>,
    ) -> Result<Version> {
        let version = {
            let _guard = self.lock_for(slug, document_id).lock().await;

            let latest = self
                .store
                .find(
                    VERSIONS_COLLECTION,
                    &Self::history_query(slug, document_id).limit(1),
                )
                .await?;
            let next = latest
                .first()
                .and_then(|row| row.get(NUMBER_FIELD))
                .and_then(Value::as_u64)
                .unwrap_or(0)
                + 1;

            let mut row = Document::new();
            row.insert(COLLECTION_FIELD.into(), Value::from(slug));
            row.insert(DOCUMENT_FIELD.into(), Value::from(document_id));
            row.insert(NUMBER_FIELD.into(), Value::from(next));
            row.insert(DATA_FIELD.into(), Value::String(serde_json::to_string(document)?));
            if let Some(author) = author {
                row.insert(CREATED_BY_FIELD.into(), Value::from(author));
            }

            let stored = self.store.insert(VERSIONS_COLLECTION, row).await?;
            Version::from_stored(&stored)?
        };
        info!(
            collection = slug,
            document = document_id,
            version = version.version_number,
            "created version"
        );

        self.schedule_prune(slug, document_id);
        Ok(version)
    }

    /// Versions of a document, newest first, bounded by the retention limit.
    pub async fn list_versions(&self, slug: &str, document_id: &str) -> Result<Vec<Version>> {
        let max = self.max_versions(slug)?;
        let rows = self
            .store
            .find(
                VERSIONS_COLLECTION,
                &Self::history_query(slug, document_id).limit(max),
            )
            .await?;
        rows.iter().map(Version::from_stored).collect()
    }

    pub async fn get_version(&self, slug: &str, version_id: &str) -> Result<Version> {
        let row = self
            .store
            .find_by_id(VERSIONS_COLLECTION, version_id)
            .await?
            .ok_or_else(|| CmsError::VersionNotFound(version_id.to_string()))?;
        let version = Version::from_stored(&row)?;
        if version.collection_slug != slug {
            return Err(CmsError::VersionNotFound(version_id.to_string()));
        }
        Ok(version)
    }

    /// Payload of a version. Applying it is up to the caller.
    pub async fn restore(&self, slug: &str, version_id: &str) -> Result<Document> {
        Ok(self.get_version(slug, version_id).await?.data)
    }

    /// Deletes everything but the newest `max_versions` versions. Returns the
    /// number of versions removed.
    pub async fn prune(&self, slug: &str, document_id: &str) -> Result<usize> {
        let max = self.max_versions(slug)?;
        let stale: Vec<String> = self
            .store
            .find(
                VERSIONS_COLLECTION,
                &Self::history_query(slug, document_id)
                    .skip(max)
                    .project(vec![NUMBER_FIELD.to_string()]),
            )
            .await?
            .iter()
            .filter_map(|row| crate::core::document_id(row).map(str::to_string))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let removed = self.store.delete_many(VERSIONS_COLLECTION, &stale).await?;
        debug!(collection = slug, document = document_id, removed, "pruned versions");
        Ok(removed)
    }

    fn schedule_prune(&self, slug: &str, document_id: &str) {
        let this = self.clone();
        let slug = slug.to_string();
        let document_id = document_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = this.prune(&slug, &document_id).await {
                warn!(
                    collection = %slug,
                    document = %document_id,
                    error = %err,
                    "failed to prune versions"
                );
            }
        });
    }
}
