//! Schema Registry
//!
//! Consumes the statically built collection and block definitions once at
//! boot, resolves block references, checks the whole set for consistency and
//! registers one storage model per collection. The resulting `SchemaRegistry`
//! is immutable and shared by handle.

mod resolver;
mod schema;

pub use resolver::{BlockResolver, MAX_BLOCK_DEPTH};
pub use schema::{CollectionSchema, StorageField, StorageType};

use crate::content::CollectionHooks;
use crate::core::{CmsError, Result, SYSTEM_FIELDS};
use crate::metadata::{
    BlockDefinition, CollectionDefinition, CollectionMetadata, FieldMetadata, FieldType,
};
use crate::storage::DocumentStore;
use crate::versions::{VERSIONS_COLLECTION, version_collection};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MAX_VERSIONS: u32 = 5;

lazy_static! {
    static ref SLUG: Regex = Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap();
}

/// A collection as the rest of the system sees it.
pub struct RegisteredCollection {
    pub metadata: CollectionMetadata,
    pub schema: CollectionSchema,
    pub hooks: Option<Arc<dyn CollectionHooks>>,
    /// Engine-owned collections are hidden from `SchemaRegistry::all`.
    pub internal: bool,
}

impl RegisteredCollection {
    pub fn slug(&self) -> &str {
        &self.metadata.slug
    }
}

impl fmt::Debug for RegisteredCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCollection")
            .field("slug", &self.metadata.slug)
            .field("internal", &self.internal)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Resolved collection metadata, keyed by slug, in registration order.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    collections: Vec<RegisteredCollection>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, slug: &str) -> Option<&RegisteredCollection> {
        self.index.get(slug).map(|&i| &self.collections[i])
    }

    pub fn require(&self, slug: &str) -> Result<&RegisteredCollection> {
        self.get(slug)
            .ok_or_else(|| CmsError::CollectionNotFound(slug.to_string()))
    }

    pub fn get_collection(&self, slug: &str) -> Option<&CollectionMetadata> {
        self.get(slug).map(|collection| &collection.metadata)
    }

    /// Every user-facing collection, internal ones excluded.
    pub fn all(&self) -> Vec<&CollectionMetadata> {
        self.collections
            .iter()
            .filter(|collection| !collection.internal)
            .map(|collection| &collection.metadata)
            .collect()
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|collection| collection.slug())
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Creates a storage model for every collection the store does not know
    /// yet. Safe to call on every boot.
    pub async fn register_models(&self, store: &dyn DocumentStore) -> Result<()> {
        for collection in &self.collections {
            if store.has_collection(collection.slug()).await {
                debug!(slug = collection.slug(), "model already registered, skipping");
                continue;
            }
            store.create_collection(collection.schema.clone()).await?;
            info!(
                slug = collection.slug(),
                fields = collection.metadata.fields.len(),
                "registered collection"
            );
        }
        Ok(())
    }
}

/// Collects definitions and produces a `SchemaRegistry`.
///
/// ```
/// use vertex_cms::metadata::{BlockDefinition, CollectionDefinition, FieldDefinition};
/// use vertex_cms::registry::SchemaRegistry;
///
/// let registry = SchemaRegistry::builder()
///     .block(BlockDefinition::new("hero").field(FieldDefinition::text("heading")))
///     .collection(
///         CollectionDefinition::new("Page", "pages")
///             .field(FieldDefinition::text("title").localized())
///             .field(FieldDefinition::blocks("layout", ["hero"])),
///     )
///     .resolve()
///     .unwrap();
///
/// let pages = registry.get_collection("pages").unwrap();
/// assert_eq!(pages.field("layout").unwrap().block("hero").unwrap().label, "Hero");
/// ```
#[derive(Debug)]
pub struct RegistryBuilder {
    blocks: Vec<BlockDefinition>,
    collections: Vec<CollectionDefinition>,
    default_max_versions: u32,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            collections: Vec::new(),
            default_max_versions: DEFAULT_MAX_VERSIONS,
        }
    }

    pub fn block(mut self, block: BlockDefinition) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn blocks(mut self, blocks: impl IntoIterator<Item = BlockDefinition>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn collection(mut self, collection: CollectionDefinition) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn collections(mut self, collections: impl IntoIterator<Item = CollectionDefinition>) -> Self {
        self.collections.extend(collections);
        self
    }

    /// Retention used by collections that do not set `max_versions`.
    pub fn default_max_versions(mut self, max: u32) -> Self {
        self.default_max_versions = max.max(1);
        self
    }

    /// Resolves and checks every definition without touching storage.
    pub fn resolve(self) -> Result<SchemaRegistry> {
        let mut library: HashMap<String, BlockDefinition> = HashMap::new();
        for block in self.blocks {
            if !SLUG.is_match(&block.slug) {
                return Err(CmsError::configuration(format!(
                    "block slug '{}' is invalid",
                    block.slug
                )));
            }
            if library.contains_key(&block.slug) {
                return Err(CmsError::configuration(format!(
                    "block '{}' is defined twice",
                    block.slug
                )));
            }
            library.insert(block.slug.clone(), block);
        }

        let mut seen = HashSet::new();
        for definition in &self.collections {
            if definition.slug.is_empty() {
                return Err(CmsError::configuration(format!(
                    "collection definition '{}' is missing its slug",
                    definition.type_name
                )));
            }
            if definition.slug == VERSIONS_COLLECTION {
                return Err(CmsError::configuration(format!(
                    "'{}' uses the reserved slug '{}'",
                    definition.type_name, VERSIONS_COLLECTION
                )));
            }
            if !SLUG.is_match(&definition.slug) {
                return Err(CmsError::configuration(format!(
                    "'{}' has an invalid slug '{}'",
                    definition.type_name, definition.slug
                )));
            }
            if !seen.insert(definition.slug.clone()) {
                return Err(CmsError::configuration(format!(
                    "slug '{}' is registered twice ('{}')",
                    definition.slug, definition.type_name
                )));
            }
        }
        seen.insert(VERSIONS_COLLECTION.to_string());

        let mut registry = SchemaRegistry::default();
        let internal = version_collection();
        let definitions = self
            .collections
            .into_iter()
            .map(|definition| (definition, false))
            .chain(std::iter::once((internal, true)));

        for (definition, internal) in definitions {
            let fields = BlockResolver::new(&library)
                .resolve_fields(&definition.fields)
                .map_err(|err| match err {
                    CmsError::Configuration(msg) => {
                        CmsError::configuration(format!("{}: {}", definition.type_name, msg))
                    }
                    other => other,
                })?;
            check_fields(&definition.type_name, &fields, &seen)?;

            let metadata = CollectionMetadata {
                name: definition
                    .plural_name
                    .clone()
                    .unwrap_or_else(|| resolver::title_case(&definition.slug)),
                slug: definition.slug.clone(),
                singular_name: definition.singular_name.clone(),
                plural_name: definition.plural_name.clone(),
                timestamps: definition.timestamps,
                drafts: definition.drafts,
                max_versions: definition
                    .max_versions
                    .unwrap_or(self.default_max_versions)
                    .max(1),
                access: definition.access.clone(),
                fields,
            };
            let schema = CollectionSchema::from_metadata(&metadata);

            registry
                .index
                .insert(metadata.slug.clone(), registry.collections.len());
            registry.collections.push(RegisteredCollection {
                metadata,
                schema,
                hooks: definition.hooks,
                internal,
            });
        }
        Ok(registry)
    }

    /// Resolves the definitions and registers their storage models.
    pub async fn register(self, store: &dyn DocumentStore) -> Result<SchemaRegistry> {
        let registry = self.resolve()?;
        registry.register_models(store).await?;
        Ok(registry)
    }
}

/// Checks field names, select options and relationship targets, descending
/// into resolved blocks.
fn check_fields(owner: &str, fields: &[FieldMetadata], slugs: &HashSet<String>) -> Result<()> {
    let mut names = HashSet::new();
    for field in fields {
        let definition = &field.definition;
        let name = definition.name.as_str();
        if name.is_empty() {
            return Err(CmsError::configuration(format!(
                "{}: field without a name",
                owner
            )));
        }
        if SYSTEM_FIELDS.contains(&name) {
            return Err(CmsError::configuration(format!(
                "{}: field '{}' shadows a system field",
                owner, name
            )));
        }
        if !names.insert(name) {
            return Err(CmsError::configuration(format!(
                "{}: field '{}' is declared twice",
                owner, name
            )));
        }

        match definition.field_type {
            FieldType::Select if definition.options.is_empty() => {
                return Err(CmsError::configuration(format!(
                    "{}: select field '{}' has no options",
                    owner, name
                )));
            }
            FieldType::Relationship => {
                let target = definition.relation_to.as_deref().unwrap_or_default();
                if !slugs.contains(target) {
                    return Err(CmsError::configuration(format!(
                        "{}: relationship '{}' targets unregistered collection '{}'",
                        owner, name, target
                    )));
                }
            }
            FieldType::Blocks => {
                for block in field.blocks.iter().flatten() {
                    check_fields(&format!("{} > {}", owner, block.slug), &block.fields, slugs)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}
