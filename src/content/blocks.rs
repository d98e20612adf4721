use crate::core::{CmsError, Document, Result};
use crate::metadata::FieldMetadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BLOCK_TYPE_FIELD: &str = "blockType";

/// One entry of a block-list field: the tag naming its block, plus the
/// block's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInstance {
    #[serde(rename = "blockType")]
    pub block_type: String,
    #[serde(flatten)]
    pub fields: Document,
}

impl BlockInstance {
    pub fn new(block_type: impl Into<String>, fields: Document) -> Self {
        Self {
            block_type: block_type.into(),
            fields,
        }
    }

    pub fn from_value(field: &str, value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|_| {
            CmsError::validation(format!(
                "items of '{}' must be objects with a string '{}'",
                field, BLOCK_TYPE_FIELD
            ))
        })
    }

    pub fn into_value(self) -> Value {
        let mut map = Document::new();
        map.insert(BLOCK_TYPE_FIELD.to_string(), Value::String(self.block_type));
        map.extend(self.fields);
        Value::Object(map)
    }
}

/// Drops items whose tag is not one of the field's resolved blocks. Values
/// that are not arrays are left alone.
pub fn retain_known_blocks(field: &FieldMetadata, value: Value) -> Value {
    let Value::Array(items) = value else {
        return value;
    };
    Value::Array(
        items
            .into_iter()
            .filter(|item| {
                item.get(BLOCK_TYPE_FIELD)
                    .and_then(Value::as_str)
                    .is_some_and(|tag| field.block(tag).is_some())
            })
            .collect(),
    )
}
