use super::BlockMetadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    Email,
    RichText,
    Upload,
    Select,
    Relationship,
    Blocks,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::RichText => "rich-text",
            FieldType::Upload => "upload",
            FieldType::Select => "select",
            FieldType::Relationship => "relationship",
            FieldType::Blocks => "blocks",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Declarative description of a single field of a collection or block.
///
/// Built with the typed constructors and chained modifiers:
///
/// ```
/// use vertex_cms::metadata::FieldDefinition;
///
/// let title = FieldDefinition::text("title").required().localized().label("Title");
/// let tags = FieldDefinition::relationship("tags", "tags").many();
/// assert!(title.localized);
/// assert!(tags.relation_many);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub hidden: bool,
    pub localized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_to: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub relation_many: bool,
    /// Slugs of the blocks a block-list field accepts. Replaced by resolved
    /// `BlockMetadata` in the published metadata.
    #[serde(skip)]
    pub block_types: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type,
            required: false,
            unique: false,
            hidden: false,
            localized: false,
            default_value: None,
            min: None,
            min_length: None,
            max_length: None,
            options: Vec::new(),
            relation_to: None,
            relation_many: false,
            block_types: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Email)
    }

    pub fn rich_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::RichText)
    }

    pub fn upload(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Upload)
    }

    pub fn select(name: impl Into<String>, options: Vec<SelectOption>) -> Self {
        let mut field = Self::new(name, FieldType::Select);
        field.options = options;
        field
    }

    pub fn relationship(name: impl Into<String>, relation_to: impl Into<String>) -> Self {
        let mut field = Self::new(name, FieldType::Relationship);
        field.relation_to = Some(relation_to.into());
        field
    }

    pub fn blocks<I, S>(name: impl Into<String>, block_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, FieldType::Blocks);
        field.block_types = block_types.into_iter().map(Into::into).collect();
        field
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Relationship holds an array of references instead of one.
    pub fn many(mut self) -> Self {
        self.relation_many = true;
        self
    }

    pub fn is_relationship(&self) -> bool {
        self.field_type == FieldType::Relationship
    }
}

/// A field as published by the registry: the definition with its block
/// references replaced by fully resolved block metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetadata {
    #[serde(flatten)]
    pub definition: FieldDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BlockMetadata>>,
}

impl FieldMetadata {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn field_type(&self) -> FieldType {
        self.definition.field_type
    }

    /// Resolved block metadata for a tag, when this is a block-list field.
    pub fn block(&self, slug: &str) -> Option<&BlockMetadata> {
        self.blocks
            .as_ref()
            .and_then(|blocks| blocks.iter().find(|block| block.slug == slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(FieldType::RichText).unwrap(), json!("rich-text"));
        assert_eq!(FieldType::Relationship.to_string(), "relationship");
    }

    #[test]
    fn test_field_serialization_skips_unset_parameters() {
        let field = FieldDefinition::text("title").required().label("Title");
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], json!("text"));
        assert_eq!(value["required"], json!(true));
        assert!(value.get("relationTo").is_none());
        assert!(value.get("options").is_none());
    }

    #[test]
    fn test_relationship_builder() {
        let field = FieldDefinition::relationship("tags", "tags").many();
        assert!(field.is_relationship());
        assert_eq!(field.relation_to.as_deref(), Some("tags"));
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["relationMany"], json!(true));
    }
}
