use super::{FieldDefinition, FieldMetadata};
use crate::content::CollectionHooks;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Role token granting anonymous read access.
pub const PUBLIC_ROLE: &str = "public";
/// Role token that passes every access check.
pub const ADMIN_ROLE: &str = "admin";

/// Content operation an access rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-operation allow-lists of role tokens. `None` means "any authenticated
/// caller".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Vec<String>>,
}

impl AccessRules {
    /// Anyone may read, writes need an authenticated caller.
    pub fn public_read() -> Self {
        Self {
            read: Some(vec![PUBLIC_ROLE.to_string(), ADMIN_ROLE.to_string()]),
            ..Self::default()
        }
    }

    pub fn admin_only() -> Self {
        let admin = Some(vec![ADMIN_ROLE.to_string()]);
        Self {
            read: admin.clone(),
            create: admin.clone(),
            update: admin.clone(),
            delete: admin,
        }
    }

    pub fn allow(mut self, operation: Operation, roles: &[&str]) -> Self {
        let roles = Some(roles.iter().map(|r| r.to_string()).collect());
        match operation {
            Operation::Read => self.read = roles,
            Operation::Create => self.create = roles,
            Operation::Update => self.update = roles,
            Operation::Delete => self.delete = roles,
        }
        self
    }

    pub fn roles_for(&self, operation: Operation) -> Option<&[String]> {
        match operation {
            Operation::Read => self.read.as_deref(),
            Operation::Create => self.create.as_deref(),
            Operation::Update => self.update.as_deref(),
            Operation::Delete => self.delete.as_deref(),
        }
    }
}

/// Statically constructed description of a collection, consumed by the
/// schema registry at boot.
#[derive(Clone)]
pub struct CollectionDefinition {
    /// Name of the Rust type or definition site, reported in boot errors.
    pub type_name: String,
    pub slug: String,
    pub singular_name: Option<String>,
    pub plural_name: Option<String>,
    pub timestamps: bool,
    pub drafts: bool,
    /// Falls back to the configured default when unset.
    pub max_versions: Option<u32>,
    pub access: AccessRules,
    pub hooks: Option<Arc<dyn CollectionHooks>>,
    pub fields: Vec<FieldDefinition>,
}

impl CollectionDefinition {
    pub fn new(type_name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            slug: slug.into(),
            singular_name: None,
            plural_name: None,
            timestamps: false,
            drafts: true,
            max_versions: None,
            access: AccessRules::default(),
            hooks: None,
            fields: Vec::new(),
        }
    }

    pub fn singular(mut self, name: impl Into<String>) -> Self {
        self.singular_name = Some(name.into());
        self
    }

    pub fn plural(mut self, name: impl Into<String>) -> Self {
        self.plural_name = Some(name.into());
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn drafts(mut self, enabled: bool) -> Self {
        self.drafts = enabled;
        self
    }

    pub fn max_versions(mut self, max: u32) -> Self {
        self.max_versions = Some(max);
        self
    }

    pub fn access(mut self, access: AccessRules) -> Self {
        self.access = access;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn CollectionHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

impl fmt::Debug for CollectionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDefinition")
            .field("type_name", &self.type_name)
            .field("slug", &self.slug)
            .field("timestamps", &self.timestamps)
            .field("drafts", &self.drafts)
            .field("max_versions", &self.max_versions)
            .field("access", &self.access)
            .field("hooks", &self.hooks.is_some())
            .field("fields", &self.fields)
            .finish()
    }
}

/// Resolved, JSON-serializable description of a registered collection. This
/// is what the config surface hands to form-rendering clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub singular_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural_name: Option<String>,
    pub timestamps: bool,
    pub drafts: bool,
    pub max_versions: u32,
    pub access: AccessRules,
    pub fields: Vec<FieldMetadata>,
}

impl CollectionMetadata {
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn relationship_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields
            .iter()
            .filter(|field| field.definition.is_relationship())
    }
}
