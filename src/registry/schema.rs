use crate::core::{CREATED_BY_FIELD, DocumentStatus, PUBLISHED_AT_FIELD, STATUS_FIELD};
use crate::metadata::{CollectionMetadata, FieldMetadata, FieldType};
use serde::Serialize;
use serde_json::Value;

/// How a field is laid out in the document store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StorageType {
    Text,
    Number,
    Boolean,
    Date,
    /// Text restricted to a set of values.
    Enum { values: Vec<Value> },
    /// Foreign-key token, or an array of tokens.
    Reference { target: String, many: bool },
    /// Array of records tagged with `blockType`.
    Variants { tags: Vec<String> },
    /// Locale code -> value, whatever the underlying type.
    LocaleMap,
}

impl StorageType {
    pub fn for_field(field: &FieldMetadata) -> Self {
        let definition = &field.definition;
        if definition.localized {
            return StorageType::LocaleMap;
        }
        match definition.field_type {
            FieldType::Text | FieldType::Email | FieldType::RichText | FieldType::Upload => {
                StorageType::Text
            }
            FieldType::Number => StorageType::Number,
            FieldType::Boolean => StorageType::Boolean,
            FieldType::Date => StorageType::Date,
            FieldType::Select => StorageType::Enum {
                values: definition.options.iter().map(|o| o.value.clone()).collect(),
            },
            FieldType::Relationship => StorageType::Reference {
                target: definition.relation_to.clone().unwrap_or_default(),
                many: definition.relation_many,
            },
            FieldType::Blocks => StorageType::Variants {
                tags: field
                    .blocks
                    .iter()
                    .flatten()
                    .map(|block| block.slug.clone())
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageField {
    pub name: String,
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub required: bool,
    pub unique: bool,
}

impl StorageField {
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            storage_type,
            required: false,
            unique: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Storage model of one collection, handed to `DocumentStore::create_collection`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<StorageField>,
    pub timestamps: bool,
    pub drafts: bool,
}

impl CollectionSchema {
    pub fn from_metadata(metadata: &CollectionMetadata) -> Self {
        let mut fields: Vec<StorageField> = metadata
            .fields
            .iter()
            .map(|field| StorageField {
                name: field.name().to_string(),
                storage_type: StorageType::for_field(field),
                required: field.definition.required,
                unique: field.definition.unique,
            })
            .collect();

        fields.push(StorageField::new(CREATED_BY_FIELD, StorageType::Text));
        if metadata.drafts {
            let statuses = [
                DocumentStatus::Draft,
                DocumentStatus::Published,
                DocumentStatus::Archived,
            ];
            fields.push(
                StorageField::new(
                    STATUS_FIELD,
                    StorageType::Enum {
                        values: statuses.iter().map(|s| Value::from(s.as_str())).collect(),
                    },
                )
                .required(),
            );
            fields.push(StorageField::new(PUBLISHED_AT_FIELD, StorageType::Date));
        }

        Self {
            name: metadata.slug.clone(),
            fields,
            timestamps: metadata.timestamps,
            drafts: metadata.drafts,
        }
    }

    pub fn field(&self, name: &str) -> Option<&StorageField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &StorageField> {
        self.fields.iter().filter(|field| field.unique)
    }
}
