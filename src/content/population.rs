use super::projection::{LocaleView, project};
use crate::core::{Document, Result};
use crate::populate::{PopulateStep, build_plan};
use crate::registry::{RegisteredCollection, SchemaRegistry};
use crate::storage::DocumentStore;
use async_recursion::async_recursion;
use serde_json::Value;

/// Resolves the references named by `spec` in `documents`.
///
/// Every joined document is shaped as a read of its own collection: projected
/// with that collection's metadata when a locale view is given, then passed
/// through that collection's `after_read` hook.
pub(crate) async fn populate(
    store: &dyn DocumentStore,
    registry: &SchemaRegistry,
    slug: &str,
    documents: Vec<Document>,
    spec: &str,
    view: Option<LocaleView<'_>>,
) -> Result<Vec<Document>> {
    let plan = build_plan(spec, slug, registry);
    if plan.is_empty() {
        return Ok(documents);
    }
    let documents = store.populate(slug, documents, &plan).await?;
    let mut shaped = Vec::with_capacity(documents.len());
    for document in documents {
        shaped.push(shape_joined(registry, &plan, document, view).await?);
    }
    Ok(shaped)
}

#[async_recursion]
async fn shape_joined<'a>(
    registry: &'a SchemaRegistry,
    plan: &'a [PopulateStep],
    mut document: Document,
    view: Option<LocaleView<'a>>,
) -> Result<Document> {
    for step in plan {
        let Some(target) = registry.get(&step.collection) else {
            continue;
        };
        let Some(value) = document.get_mut(&step.path) else {
            continue;
        };
        *value = match std::mem::take(value) {
            Value::Array(items) => {
                let mut joined = Vec::with_capacity(items.len());
                for item in items {
                    joined.push(shape_one(registry, target, step, item, view).await?);
                }
                Value::Array(joined)
            }
            single => shape_one(registry, target, step, single, view).await?,
        };
    }
    Ok(document)
}

async fn shape_one<'a>(
    registry: &'a SchemaRegistry,
    target: &'a RegisteredCollection,
    step: &'a PopulateStep,
    joined: Value,
    view: Option<LocaleView<'a>>,
) -> Result<Value> {
    let Value::Object(document) = joined else {
        return Ok(joined);
    };
    let document = match view {
        Some(view) => project(&target.metadata, document, view),
        None => document,
    };
    let document = match &target.hooks {
        Some(hooks) => hooks.after_read(document).await?,
        None => document,
    };
    Ok(Value::Object(
        shape_joined(registry, &step.populate, document, view).await?,
    ))
}
