use super::{FieldDefinition, FieldMetadata};
use serde::Serialize;

/// A reusable group of fields embedded inside block-list fields.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDefinition {
    pub slug: String,
    pub label: Option<String>,
    pub icon: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

impl BlockDefinition {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            label: None,
            icon: None,
            fields: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

/// Flattened, serializable form of a block after registry resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockMetadata {
    pub slug: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub fields: Vec<FieldMetadata>,
}

impl BlockMetadata {
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.name() == name)
    }
}
