//! Content Engine
//!
//! Generic CRUD over every registered collection: hook invocation, payload
//! validation, the draft/publish state machine, locale projection,
//! population and version snapshots.
//!
//! Writes run on a detached task so that a caller going away mid-request
//! cannot cancel a store call halfway through.

mod blocks;
mod hooks;
mod population;
mod projection;
mod query;
mod validation;

pub use blocks::{BLOCK_TYPE_FIELD, BlockInstance, retain_known_blocks};
pub use hooks::{CollectionHooks, HookOperation};
pub use query::{DeleteResult, FindOneOptions, FindQuery, PaginatedDocuments, StatusFilter};
pub use validation::{
    EmailRule, LengthRule, MinRule, PayloadValidator, RelationshipRule, SelectOptionRule,
    TypeRule, ValidationMode, ValidationRule,
};

use crate::access::{self, Caller};
use crate::config::CmsConfig;
use crate::core::{
    CREATED_AT_FIELD, CREATED_BY_FIELD, CmsError, Document, DocumentStatus, PUBLISHED_AT_FIELD,
    Result, STATUS_FIELD, SYSTEM_FIELDS, now_timestamp,
};
use crate::locale::resolve_value;
use crate::metadata::Operation;
use crate::registry::{RegisteredCollection, SchemaRegistry};
use crate::storage::{DocumentStore, Filter, Sort, StoreQuery};
use crate::versions::{Version, VersionStore};
use futures::future::try_join_all;
use projection::{LocaleView, project};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_SEARCH_FIELDS: [&str; 2] = ["title", "name"];

/// Runs a write to completion on its own task, even if the calling future
/// is dropped.
async fn detach<T, F>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(future).await?
}

/// Removes top-level fields sent as empty strings.
fn strip_empty(mut data: Document) -> Document {
    data.retain(|_, value| !matches!(value, Value::String(s) if s.is_empty()));
    data
}

fn author_of(document: &Document) -> Option<String> {
    document
        .get(CREATED_BY_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn default_sort(collection: &RegisteredCollection) -> Sort {
    if collection.metadata.timestamps {
        Sort::by(CREATED_AT_FIELD, true)
    } else {
        Sort::Natural { descending: true }
    }
}

/// Entry point for all content operations.
#[derive(Clone)]
pub struct ContentEngine {
    store: Arc<dyn DocumentStore>,
    registry: Arc<SchemaRegistry>,
    versions: VersionStore,
    config: Arc<CmsConfig>,
    validator: Arc<PayloadValidator>,
}

impl ContentEngine {
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<SchemaRegistry>, config: CmsConfig) -> Self {
        let versions = VersionStore::new(Arc::clone(&store), Arc::clone(&registry));
        Self {
            store,
            registry,
            versions,
            config: Arc::new(config),
            validator: Arc::new(PayloadValidator::new()),
        }
    }

    pub fn with_validator(mut self, validator: PayloadValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CmsConfig {
        &self.config
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    fn locale_view<'a>(&'a self, requested: Option<&'a str>) -> LocaleView<'a> {
        let default = self.config.locales.default_locale();
        LocaleView {
            requested: requested.unwrap_or(default),
            default,
        }
    }

    async fn after_read(&self, collection: &RegisteredCollection, document: Document) -> Result<Document> {
        match &collection.hooks {
            Some(hooks) => hooks.after_read(document).await,
            None => Ok(document),
        }
    }

    async fn before_change(
        &self,
        collection: &RegisteredCollection,
        data: Document,
        operation: HookOperation,
    ) -> Result<Document> {
        match &collection.hooks {
            Some(hooks) => hooks.before_change(data, operation).await,
            None => Ok(data),
        }
    }

    /// Checks whether `caller` may perform `operation` on a collection.
    pub fn authorize(&self, slug: &str, operation: Operation, caller: &Caller) -> Result<()> {
        let collection = self.registry.require(slug)?;
        access::authorize(&collection.metadata, operation, caller)
    }

    /// Lists documents, newest first unless the query sorts explicitly.
    ///
    /// On drafts-enabled collections only published documents are returned
    /// unless the query asks for `StatusFilter::All` or a specific status.
    pub async fn find_all(&self, slug: &str, query: FindQuery) -> Result<PaginatedDocuments> {
        let collection = self.registry.require(slug)?;

        let mut filter = Filter::new();
        if collection.metadata.drafts {
            match query.status {
                StatusFilter::Default => {
                    filter = filter.eq(STATUS_FIELD, DocumentStatus::Published.as_str())
                }
                StatusFilter::Only(status) => filter = filter.eq(STATUS_FIELD, status.as_str()),
                StatusFilter::All => {}
            }
        }
        for (field, value) in &query.filters {
            filter = filter.eq(field.clone(), value.clone());
        }

        let (page, limit, skip) = query.window(&self.config);
        let sort = query
            .sort
            .as_deref()
            .and_then(Sort::parse)
            .unwrap_or_else(|| default_sort(collection));

        let total_docs = self.store.count(slug, &filter).await?;
        let stored = self
            .store
            .find(
                slug,
                &StoreQuery::new(filter).sort(sort).skip(skip).limit(limit),
            )
            .await?;

        let view = self.locale_view(query.locale.as_deref());
        let docs = try_join_all(stored.into_iter().map(|document| {
            self.after_read(collection, project(&collection.metadata, document, view))
        }))
        .await?;

        Ok(PaginatedDocuments {
            docs,
            total_docs,
            page,
            total_pages: total_docs.div_ceil(limit),
            limit,
        })
    }

    /// Fetches one document. `raw` keeps stored locale maps and hidden
    /// fields, as needed by editors.
    ///
    /// The collection's `after_read` hook runs before population; joined
    /// documents go through their own collection's hook.
    pub async fn find_one(&self, slug: &str, id: &str, options: FindOneOptions) -> Result<Document> {
        let collection = self.registry.require(slug)?;
        let document = self
            .store
            .find_by_id(slug, id)
            .await?
            .ok_or_else(|| CmsError::document_not_found(slug, id))?;

        let view = (!options.raw).then(|| self.locale_view(options.locale.as_deref()));

        let mut document = self.after_read(collection, document).await?;
        if let Some(spec) = options.populate.as_deref().filter(|s| !s.trim().is_empty()) {
            let populated = population::populate(
                self.store.as_ref(),
                &self.registry,
                slug,
                vec![document],
                spec,
                view,
            )
            .await?;
            document = populated
                .into_iter()
                .next()
                .ok_or_else(|| CmsError::document_not_found(slug, id))?;
        }

        Ok(match view {
            Some(view) => project(&collection.metadata, document, view),
            None => document,
        })
    }

    /// Creates a document. Drafts-enabled collections start it as `draft`.
    pub async fn create(&self, slug: &str, data: Document) -> Result<Document> {
        let collection = self.registry.require(slug)?;

        let mut data = self
            .before_change(collection, strip_empty(data), HookOperation::Create)
            .await?;
        let author = author_of(&data);
        data.retain(|key, _| !SYSTEM_FIELDS.contains(&key.as_str()));

        let mut prepared = self.validator.prepare(
            &collection.metadata.fields,
            data,
            ValidationMode::Create,
            None,
            &self.config.locales,
        )?;
        if collection.metadata.drafts {
            prepared.insert(
                STATUS_FIELD.to_string(),
                Value::from(DocumentStatus::Draft.as_str()),
            );
        }
        if let Some(author) = author {
            prepared.insert(CREATED_BY_FIELD.to_string(), Value::String(author));
        }

        let store = Arc::clone(&self.store);
        let target = slug.to_string();
        let stored = detach(async move { store.insert(&target, prepared).await }).await?;
        debug!(collection = slug, id = crate::core::document_id(&stored), "created document");

        self.after_read(collection, stored).await
    }

    /// Creates a document on behalf of `caller`, recording them as author.
    pub async fn create_as(&self, slug: &str, mut data: Document, caller: &Caller) -> Result<Document> {
        self.authorize(slug, Operation::Create, caller)?;
        data.remove(CREATED_BY_FIELD);
        if let Some(user_id) = caller.user_id() {
            data.insert(CREATED_BY_FIELD.to_string(), Value::from(user_id));
        }
        self.create(slug, data).await
    }

    /// Partially updates a document.
    ///
    /// Status cannot be changed here; use `publish`/`unpublish`. Updating a
    /// published document records a version of the new state, attributed
    /// to the document's author.
    pub async fn update(&self, slug: &str, id: &str, data: Document) -> Result<Document> {
        let collection = self.registry.require(slug)?;
        let current = self
            .store
            .find_by_id(slug, id)
            .await?
            .ok_or_else(|| CmsError::document_not_found(slug, id))?;
        let previous = DocumentStatus::of(&current);

        let mut data = self
            .before_change(collection, strip_empty(data), HookOperation::Update)
            .await?;
        if let Some(requested) = data.remove(STATUS_FIELD)
            && collection.metadata.drafts
            && requested.as_str() != previous.map(|s| s.as_str())
        {
            return Err(CmsError::validation(
                "status can only be changed through publish or unpublish",
            ));
        }
        data.retain(|key, _| !SYSTEM_FIELDS.contains(&key.as_str()));

        let prepared = self.validator.prepare(
            &collection.metadata.fields,
            data,
            ValidationMode::Update,
            Some(&current),
            &self.config.locales,
        )?;

        let store = Arc::clone(&self.store);
        let versions = self.versions.clone();
        let target = slug.to_string();
        let id_owned = id.to_string();
        let author = author_of(&current);
        let was_published = collection.metadata.drafts && previous == Some(DocumentStatus::Published);

        let updated = detach(async move {
            let updated = store
                .update_by_id(&target, &id_owned, prepared)
                .await?
                .ok_or_else(|| CmsError::document_not_found(&target, &id_owned))?;
            if was_published && DocumentStatus::of(&updated) == Some(DocumentStatus::Published) {
                versions
                    .create_version(&target, &id_owned, &updated, author.as_deref())
                    .await?;
            }
            Ok(updated)
        })
        .await?;
        debug!(collection = slug, id, "updated document");

        self.after_read(collection, updated).await
    }

    /// Moves a document to `published` and records a version of it.
    pub async fn publish(&self, slug: &str, id: &str) -> Result<Document> {
        let collection = self.require_drafts(slug)?;
        let current = self
            .store
            .find_by_id(slug, id)
            .await?
            .ok_or_else(|| CmsError::document_not_found(slug, id))?;
        if DocumentStatus::of(&current) == Some(DocumentStatus::Archived) {
            return Err(CmsError::validation("archived documents cannot be published"));
        }

        let mut changes = Document::new();
        changes.insert(
            STATUS_FIELD.to_string(),
            Value::from(DocumentStatus::Published.as_str()),
        );
        changes.insert(PUBLISHED_AT_FIELD.to_string(), Value::String(now_timestamp()));

        let store = Arc::clone(&self.store);
        let versions = self.versions.clone();
        let target = slug.to_string();
        let id_owned = id.to_string();
        let author = author_of(&current);

        let published = detach(async move {
            let published = store
                .update_by_id(&target, &id_owned, changes)
                .await?
                .ok_or_else(|| CmsError::document_not_found(&target, &id_owned))?;
            versions
                .create_version(&target, &id_owned, &published, author.as_deref())
                .await?;
            Ok(published)
        })
        .await?;
        info!(collection = slug, id, "published document");

        self.after_read(collection, published).await
    }

    /// Moves a document back to `draft`. No version is recorded.
    pub async fn unpublish(&self, slug: &str, id: &str) -> Result<Document> {
        let collection = self.require_drafts(slug)?;
        let current = self
            .store
            .find_by_id(slug, id)
            .await?
            .ok_or_else(|| CmsError::document_not_found(slug, id))?;
        if DocumentStatus::of(&current) == Some(DocumentStatus::Archived) {
            return Err(CmsError::validation("archived documents cannot be unpublished"));
        }

        let mut changes = Document::new();
        changes.insert(
            STATUS_FIELD.to_string(),
            Value::from(DocumentStatus::Draft.as_str()),
        );

        let store = Arc::clone(&self.store);
        let target = slug.to_string();
        let id_owned = id.to_string();
        let document = detach(async move {
            store
                .update_by_id(&target, &id_owned, changes)
                .await?
                .ok_or_else(|| CmsError::document_not_found(&target, &id_owned))
        })
        .await?;
        info!(collection = slug, id, "unpublished document");

        self.after_read(collection, document).await
    }

    /// Permanently removes a document. Its version history is kept.
    pub async fn delete(&self, slug: &str, id: &str) -> Result<DeleteResult> {
        self.registry.require(slug)?;
        let store = Arc::clone(&self.store);
        let target = slug.to_string();
        let id_owned = id.to_string();
        let removed = detach(async move { store.delete_by_id(&target, &id_owned).await }).await?;
        if removed.is_none() {
            return Err(CmsError::document_not_found(slug, id));
        }
        debug!(collection = slug, id, "deleted document");
        Ok(DeleteResult {
            id: id.to_string(),
            deleted: true,
        })
    }

    /// Autocomplete lookup for relationship pickers.
    ///
    /// Matches `term` case-insensitively against `fields` (default `title`
    /// and `name`) and returns `_id` plus those fields, localized values
    /// resolved to the default locale. Returns at most `limit` documents;
    /// `None` means the configured page size.
    pub async fn search_for_relationship(
        &self,
        slug: &str,
        term: &str,
        limit: Option<usize>,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<Document>> {
        let collection = self.registry.require(slug)?;
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        let fields: Vec<String> = fields
            .filter(|fields| !fields.is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_FIELDS.iter().map(|f| f.to_string()).collect());

        let mut filter = Filter::new();
        if collection.metadata.drafts {
            filter = filter.eq(STATUS_FIELD, DocumentStatus::Published.as_str());
        }
        let term = term.trim();
        if !term.is_empty() {
            filter = filter.contains(fields.clone(), term);
        }

        let query = StoreQuery::new(filter)
            .sort(default_sort(collection))
            .limit(self.config.clamp_limit(limit))
            .project(fields.clone());
        let mut found = self.store.find(slug, &query).await?;

        let default = self.config.locales.default_locale();
        for document in &mut found {
            for name in &fields {
                let localized = collection
                    .metadata
                    .field(name)
                    .is_some_and(|field| field.definition.localized);
                if let Some(value) = document.get_mut(name)
                    && localized
                {
                    *value = resolve_value(value, default, default);
                }
            }
        }
        Ok(found)
    }

    /// Version history of a document, newest first.
    pub async fn list_versions(&self, slug: &str, id: &str) -> Result<Vec<Version>> {
        self.registry.require(slug)?;
        self.versions.list_versions(slug, id).await
    }

    /// Applies a version's content to its document as an update. The
    /// document keeps its current publish state.
    pub async fn restore_version(&self, slug: &str, version_id: &str) -> Result<Document> {
        self.registry.require(slug)?;
        let version = self.versions.get_version(slug, version_id).await?;
        let mut payload = version.data;
        payload.retain(|key, _| !SYSTEM_FIELDS.contains(&key.as_str()));
        info!(
            collection = slug,
            id = %version.document_id,
            version = version.version_number,
            "restoring version"
        );
        self.update(slug, &version.document_id, payload).await
    }

    fn require_drafts(&self, slug: &str) -> Result<&RegisteredCollection> {
        let collection = self.registry.require(slug)?;
        if !collection.metadata.drafts {
            return Err(CmsError::configuration(format!(
                "collection '{}' does not use drafts",
                slug
            )));
        }
        Ok(collection)
    }
}
