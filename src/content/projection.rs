use super::blocks::{BLOCK_TYPE_FIELD, retain_known_blocks};
use crate::core::Document;
use crate::locale::resolve_value;
use crate::metadata::{CollectionMetadata, FieldMetadata, FieldType};
use serde_json::Value;

/// Locale and fallback used to flatten localized fields.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocaleView<'a> {
    pub requested: &'a str,
    pub default: &'a str,
}

/// Shapes a stored document for a reader: hidden fields removed, localized
/// fields resolved to a single value, unknown block items dropped.
pub(crate) fn project(collection: &CollectionMetadata, document: Document, view: LocaleView<'_>) -> Document {
    project_fields(&collection.fields, document, view)
}

fn project_fields(fields: &[FieldMetadata], mut document: Document, view: LocaleView<'_>) -> Document {
    for field in fields {
        let name = field.name();
        if field.definition.hidden {
            document.remove(name);
            continue;
        }
        let Some(value) = document.get_mut(name) else {
            continue;
        };
        if field.definition.localized {
            *value = resolve_value(value, view.requested, view.default);
        }
        if field.field_type() == FieldType::Blocks {
            let items = retain_known_blocks(field, std::mem::take(value));
            *value = project_blocks(field, items, view);
        }
    }
    document
}

fn project_blocks(field: &FieldMetadata, items: Value, view: LocaleView<'_>) -> Value {
    let Value::Array(items) = items else {
        return items;
    };
    Value::Array(
        items
            .into_iter()
            .map(|item| {
                let Value::Object(map) = item else {
                    return item;
                };
                let block = map
                    .get(BLOCK_TYPE_FIELD)
                    .and_then(Value::as_str)
                    .and_then(|tag| field.block(tag));
                match block {
                    Some(block) => Value::Object(project_fields(&block.fields, map, view)),
                    None => Value::Object(map),
                }
            })
            .collect(),
    )
}
