//! Relationship Population Planner
//!
//! Turns a request such as `author,author.company,tags` into a tree of join
//! steps. Planning is best-effort: segments that are not relationship fields
//! of the collection they are looked up in are dropped rather than reported.

use crate::registry::SchemaRegistry;
use serde::Serialize;
use std::collections::HashSet;

/// Maximum number of relationship hops followed from the root collection.
pub const MAX_POPULATE_DEPTH: usize = 3;

/// One join: replace the reference tokens in `path` with documents of
/// `collection`, then apply `populate` to those documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulateStep {
    pub path: String,
    pub collection: String,
    pub many: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub populate: Vec<PopulateStep>,
}

impl PopulateStep {
    pub fn new(path: impl Into<String>, collection: impl Into<String>, many: bool) -> Self {
        Self {
            path: path.into(),
            collection: collection.into(),
            many,
            populate: Vec::new(),
        }
    }

    /// Number of levels in this subtree, counting this step.
    pub fn depth(&self) -> usize {
        1 + self
            .populate
            .iter()
            .map(PopulateStep::depth)
            .max()
            .unwrap_or(0)
    }
}

/// Builds the join tree for `spec` starting at collection `root`.
pub fn build_plan(spec: &str, root: &str, registry: &SchemaRegistry) -> Vec<PopulateStep> {
    let mut plan: Vec<PopulateStep> = Vec::new();
    for path in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let segments: Vec<&str> = path
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let mut branch = HashSet::new();
        merge_path(&mut plan, &segments, root, registry, 1, &mut branch);
    }
    plan
}

fn merge_path<'a>(
    steps: &mut Vec<PopulateStep>,
    segments: &[&'a str],
    collection: &'a str,
    registry: &'a SchemaRegistry,
    depth: usize,
    branch: &mut HashSet<(&'a str, &'a str)>,
) {
    let Some((&segment, rest)) = segments.split_first() else {
        return;
    };
    if depth > MAX_POPULATE_DEPTH {
        return;
    }
    let Some(metadata) = registry.get_collection(collection) else {
        return;
    };
    let Some(field) = metadata
        .relationship_fields()
        .find(|field| field.name() == segment)
    else {
        return;
    };
    let Some(target) = field.definition.relation_to.as_deref() else {
        return;
    };
    if !branch.insert((collection, segment)) {
        return;
    }

    let position = match steps.iter().position(|step| step.path == segment) {
        Some(position) => position,
        None => {
            steps.push(PopulateStep::new(
                segment,
                target,
                field.definition.relation_many,
            ));
            steps.len() - 1
        }
    };
    merge_path(
        &mut steps[position].populate,
        rest,
        target,
        registry,
        depth + 1,
        branch,
    );
}
