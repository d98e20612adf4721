//! Incoming payload checks.
//!
//! Field-level checks are a chain of `ValidationRule`s. `PayloadValidator`
//! walks a collection's (or block's) fields, applies defaults and the rule
//! chain, normalizes localized input and recurses into block items.

use super::blocks::BlockInstance;
use crate::core::value::{type_name, values_match};
use crate::core::{CmsError, Document, Result};
use crate::locale::{LocaleConfig, set_value};
use crate::metadata::{FieldDefinition, FieldMetadata, FieldType};
use chrono::{DateTime, NaiveDate};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Whether missing required fields are an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    /// Partial payload; absent fields keep their stored value.
    Update,
}

/// A single check on a present, non-null, non-localized value.
pub trait ValidationRule: Send + Sync {
    fn validate(&self, field: &FieldDefinition, value: &Value) -> Result<()>;
}

fn invalid(field: &FieldDefinition, message: impl std::fmt::Display) -> CmsError {
    CmsError::validation(format!("field '{}' {}", field.name, message))
}

/// The value's JSON type fits the field type.
#[derive(Debug, Clone, Default)]
pub struct TypeRule;

impl ValidationRule for TypeRule {
    fn validate(&self, field: &FieldDefinition, value: &Value) -> Result<()> {
        let ok = match field.field_type {
            FieldType::Text | FieldType::Email | FieldType::RichText => value.is_string(),
            // adapter token, or the adapter's descriptor object
            FieldType::Upload => value.is_string() || value.is_object(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Date => value.as_str().is_some_and(is_date),
            FieldType::Select => value.is_string() || value.is_number(),
            FieldType::Relationship | FieldType::Blocks => true,
        };
        if ok {
            Ok(())
        } else {
            Err(invalid(
                field,
                format!("expects {}, got {}", field.field_type, type_name(value)),
            ))
        }
    }
}

fn is_date(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok() || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

/// Select values must be one of the declared options.
#[derive(Debug, Clone, Default)]
pub struct SelectOptionRule;

impl ValidationRule for SelectOptionRule {
    fn validate(&self, field: &FieldDefinition, value: &Value) -> Result<()> {
        if field.field_type != FieldType::Select {
            return Ok(());
        }
        if field.options.iter().any(|option| values_match(value, &option.value)) {
            return Ok(());
        }
        Err(invalid(field, format!("does not allow {}", value)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MinRule;

impl ValidationRule for MinRule {
    fn validate(&self, field: &FieldDefinition, value: &Value) -> Result<()> {
        match (field.min, value.as_f64()) {
            (Some(min), Some(number)) if number < min => {
                Err(invalid(field, format!("must be at least {}", min)))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LengthRule;

impl ValidationRule for LengthRule {
    fn validate(&self, field: &FieldDefinition, value: &Value) -> Result<()> {
        let Some(text) = value.as_str() else {
            return Ok(());
        };
        let len = text.chars().count();
        if let Some(min) = field.min_length
            && len < min
        {
            return Err(invalid(field, format!("must be at least {} characters", min)));
        }
        if let Some(max) = field.max_length
            && len > max
        {
            return Err(invalid(field, format!("must be at most {} characters", max)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailRule;

impl ValidationRule for EmailRule {
    fn validate(&self, field: &FieldDefinition, value: &Value) -> Result<()> {
        match value.as_str() {
            Some(email) if field.field_type == FieldType::Email && !EMAIL.is_match(email) => {
                Err(invalid(field, "is not a valid email address"))
            }
            _ => Ok(()),
        }
    }
}

/// Relationship values are reference tokens: a string, or an array of
/// strings for many-valued fields.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRule;

impl ValidationRule for RelationshipRule {
    fn validate(&self, field: &FieldDefinition, value: &Value) -> Result<()> {
        if field.field_type != FieldType::Relationship {
            return Ok(());
        }
        let ok = if field.relation_many {
            value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string))
        } else {
            value.is_string()
        };
        if ok {
            Ok(())
        } else if field.relation_many {
            Err(invalid(field, "expects an array of document ids"))
        } else {
            Err(invalid(field, "expects a document id"))
        }
    }
}

/// Checks and normalizes incoming documents against field metadata.
pub struct PayloadValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl PayloadValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(TypeRule),
                Box::new(SelectOptionRule),
                Box::new(MinRule),
                Box::new(LengthRule),
                Box::new(EmailRule),
                Box::new(RelationshipRule),
            ],
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Returns the document to persist.
    ///
    /// Unknown keys are dropped. On create, missing fields get their default
    /// value or fail when required. A scalar sent for a localized field is
    /// written into the stored locale map (`current`, when updating) under
    /// the default locale.
    pub fn prepare(
        &self,
        fields: &[FieldMetadata],
        mut data: Document,
        mode: ValidationMode,
        current: Option<&Document>,
        locales: &LocaleConfig,
    ) -> Result<Document> {
        let mut prepared = Document::new();

        for field in fields {
            let definition = &field.definition;
            let name = definition.name.as_str();

            let value = match data.remove(name) {
                Some(value) => value,
                None => {
                    if mode == ValidationMode::Create {
                        if let Some(default) = &definition.default_value {
                            let value = if definition.localized {
                                set_value(&Value::Null, locales.default_locale(), default.clone())
                            } else {
                                default.clone()
                            };
                            prepared.insert(name.to_string(), value);
                        } else if definition.required {
                            return Err(invalid(definition, "is required"));
                        }
                    }
                    continue;
                }
            };

            if value.is_null() {
                if definition.required {
                    return Err(invalid(definition, "is required"));
                }
                prepared.insert(name.to_string(), Value::Null);
                continue;
            }

            let value = if definition.localized {
                self.prepare_localized(field, value, current.and_then(|doc| doc.get(name)), locales)?
            } else {
                self.prepare_value(field, value, locales)?
            };
            prepared.insert(name.to_string(), value);
        }

        if !data.is_empty() {
            debug!(
                "dropping unknown fields: {}",
                data.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        Ok(prepared)
    }

    fn prepare_localized(
        &self,
        field: &FieldMetadata,
        value: Value,
        stored: Option<&Value>,
        locales: &LocaleConfig,
    ) -> Result<Value> {
        match value {
            Value::Object(map) => {
                let mut checked = serde_json::Map::new();
                for (locale, translation) in map {
                    if !locales.is_supported(&locale) {
                        return Err(invalid(
                            &field.definition,
                            format!("has unsupported locale '{}'", locale),
                        ));
                    }
                    let translation = if translation.is_null() || translation == "" {
                        translation
                    } else {
                        self.prepare_value(field, translation, locales)?
                    };
                    checked.insert(locale, translation);
                }
                Ok(Value::Object(checked))
            }
            scalar => {
                let scalar = self.prepare_value(field, scalar, locales)?;
                Ok(set_value(
                    stored.unwrap_or(&Value::Null),
                    locales.default_locale(),
                    scalar,
                ))
            }
        }
    }

    fn prepare_value(&self, field: &FieldMetadata, value: Value, locales: &LocaleConfig) -> Result<Value> {
        let definition = &field.definition;
        if definition.field_type == FieldType::Blocks {
            return self.prepare_blocks(field, value, locales);
        }
        for rule in &self.rules {
            rule.validate(definition, &value)?;
        }
        Ok(value)
    }

    fn prepare_blocks(&self, field: &FieldMetadata, value: Value, locales: &LocaleConfig) -> Result<Value> {
        let Value::Array(items) = value else {
            return Err(invalid(&field.definition, "expects an array of blocks"));
        };
        let mut prepared = Vec::with_capacity(items.len());
        for item in items {
            let instance = BlockInstance::from_value(field.name(), item)?;
            let block = field.block(&instance.block_type).ok_or_else(|| {
                invalid(
                    &field.definition,
                    format!("does not allow block '{}'", instance.block_type),
                )
            })?;
            let mut fields = self.prepare(
                &block.fields,
                instance.fields.clone(),
                ValidationMode::Create,
                None,
                locales,
            )?;
            if let Some(id) = instance.fields.get("id").filter(|id| id.is_string()) {
                fields.insert("id".to_string(), id.clone());
            }
            prepared.push(BlockInstance::new(instance.block_type, fields).into_value());
        }
        Ok(Value::Array(prepared))
    }
}

impl Default for PayloadValidator {
    fn default() -> Self {
        Self::new()
    }
}
