use crate::config::CmsConfig;
use crate::content::ContentEngine;
use crate::core::Result;
use crate::metadata::{BlockDefinition, CollectionDefinition};
use crate::registry::{RegistryBuilder, SchemaRegistry};
use crate::storage::{DocumentStore, InMemoryDocumentStore};
use crate::web::{ConfigState, config_router};
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// A booted CMS: registry, store and content engine wired together.
///
/// # Examples
///
/// ```
/// use vertex_cms::Vertex;
/// use vertex_cms::content::FindQuery;
/// use vertex_cms::metadata::{CollectionDefinition, FieldDefinition};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cms = Vertex::builder()
///     .collection(
///         CollectionDefinition::new("Post", "posts").field(FieldDefinition::text("title")),
///     )
///     .build()
///     .await?;
///
/// let mut data = serde_json::Map::new();
/// data.insert("title".into(), "Hello".into());
/// let post = cms.engine().create("posts", data).await?;
///
/// // drafts are hidden from default listings
/// let page = cms.engine().find_all("posts", FindQuery::new()).await?;
/// assert_eq!(page.total_docs, 0);
/// # let _ = post;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Vertex {
    engine: ContentEngine,
    registry: Arc<SchemaRegistry>,
    config: CmsConfig,
}

impl Vertex {
    pub fn builder() -> VertexBuilder {
        VertexBuilder::new()
    }

    pub fn engine(&self) -> &ContentEngine {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CmsConfig {
        &self.config
    }

    pub fn config_state(&self) -> ConfigState {
        ConfigState::new(Arc::clone(&self.registry), self.config.locales.clone())
    }

    /// Read-only config routes, ready to be nested under an API prefix.
    ///
    /// ```
    /// # use vertex_cms::{Vertex, playground};
    /// # tokio_test::block_on(async {
    /// let cms = Vertex::builder()
    ///     .blocks(playground::blocks())
    ///     .collections(playground::collections())
    ///     .build()
    ///     .await
    ///     .unwrap();
    /// let app: axum::Router = axum::Router::new().nest("/api/vertex", cms.config_router());
    /// # let _ = app;
    /// # });
    /// ```
    pub fn config_router(&self) -> Router {
        config_router(self.config_state())
    }
}

pub struct VertexBuilder {
    config: CmsConfig,
    store: Option<Arc<dyn DocumentStore>>,
    registry: RegistryBuilder,
}

impl Default for VertexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexBuilder {
    pub fn new() -> Self {
        Self {
            config: CmsConfig::default(),
            store: None,
            registry: RegistryBuilder::new(),
        }
    }

    pub fn config(mut self, config: CmsConfig) -> Self {
        self.config = config;
        self
    }

    /// Store to register models with. Defaults to a fresh in-memory store.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn block(mut self, block: BlockDefinition) -> Self {
        self.registry = self.registry.block(block);
        self
    }

    pub fn blocks(mut self, blocks: impl IntoIterator<Item = BlockDefinition>) -> Self {
        self.registry = self.registry.blocks(blocks);
        self
    }

    pub fn collection(mut self, collection: CollectionDefinition) -> Self {
        self.registry = self.registry.collection(collection);
        self
    }

    pub fn collections(mut self, collections: impl IntoIterator<Item = CollectionDefinition>) -> Self {
        self.registry = self.registry.collections(collections);
        self
    }

    /// Validates the configuration, resolves every definition and registers
    /// the storage models.
    pub async fn build(self) -> Result<Vertex> {
        self.config.validate()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let registry = self
            .registry
            .default_max_versions(self.config.default_max_versions)
            .register(store.as_ref())
            .await?;
        let registry = Arc::new(registry);
        info!(collections = registry.all().len(), "schema registry ready");

        let engine = ContentEngine::new(store, Arc::clone(&registry), self.config.clone());
        Ok(Vertex {
            engine,
            registry,
            config: self.config,
        })
    }
}
