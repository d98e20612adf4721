use crate::core::{CmsError, Result};
use crate::metadata::{BlockDefinition, BlockMetadata, FieldDefinition, FieldMetadata, FieldType};
use std::collections::HashMap;

/// Deepest block nesting allowed inside a collection.
pub const MAX_BLOCK_DEPTH: usize = 3;

/// Turns block references into flat, serializable block metadata.
///
/// Resolution keeps the chain of blocks currently being expanded, so a block
/// that (directly or through others) contains itself is reported instead of
/// recursing until the depth limit.
pub struct BlockResolver<'a> {
    library: &'a HashMap<String, BlockDefinition>,
    stack: Vec<String>,
}

impl<'a> BlockResolver<'a> {
    pub fn new(library: &'a HashMap<String, BlockDefinition>) -> Self {
        Self {
            library,
            stack: Vec::new(),
        }
    }

    /// Resolves the fields of a collection.
    pub fn resolve_fields(&mut self, fields: &[FieldDefinition]) -> Result<Vec<FieldMetadata>> {
        self.resolve_at(fields, 0)
    }

    fn resolve_at(&mut self, fields: &[FieldDefinition], depth: usize) -> Result<Vec<FieldMetadata>> {
        fields
            .iter()
            .map(|field| {
                let blocks = if field.field_type == FieldType::Blocks {
                    Some(self.resolve_block_list(field, depth + 1)?)
                } else {
                    None
                };
                Ok(FieldMetadata {
                    definition: field.clone(),
                    blocks,
                })
            })
            .collect()
    }

    fn resolve_block_list(
        &mut self,
        field: &FieldDefinition,
        depth: usize,
    ) -> Result<Vec<BlockMetadata>> {
        if depth > MAX_BLOCK_DEPTH {
            return Err(CmsError::configuration(format!(
                "block field '{}' nests deeper than {} levels ({})",
                field.name,
                MAX_BLOCK_DEPTH,
                self.stack.join(" -> ")
            )));
        }
        if field.block_types.is_empty() {
            return Err(CmsError::configuration(format!(
                "block field '{}' allows no block types",
                field.name
            )));
        }

        let mut resolved = Vec::with_capacity(field.block_types.len());
        for slug in &field.block_types {
            if self.stack.iter().any(|open| open == slug) {
                return Err(CmsError::configuration(format!(
                    "block '{}' references itself ({} -> {})",
                    slug,
                    self.stack.join(" -> "),
                    slug
                )));
            }
            let block = self.library.get(slug).ok_or_else(|| {
                CmsError::configuration(format!(
                    "block field '{}' references unknown block '{}'",
                    field.name, slug
                ))
            })?;

            self.stack.push(slug.clone());
            let fields = self.resolve_at(&block.fields, depth);
            self.stack.pop();

            resolved.push(BlockMetadata {
                slug: block.slug.clone(),
                label: block.label.clone().unwrap_or_else(|| title_case(&block.slug)),
                icon: block.icon.clone(),
                fields: fields?,
            });
        }
        Ok(resolved)
    }
}

/// `hero-banner` -> `Hero Banner`
pub(crate) fn title_case(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
