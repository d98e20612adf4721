use crate::core::{
    CREATED_AT_FIELD, CmsError, Document, ID_FIELD, Result, UPDATED_AT_FIELD, new_document_id,
    now_timestamp,
};
use crate::registry::CollectionSchema;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Documents of one collection, kept in insertion order.
#[derive(Debug, Clone)]
pub struct DocumentTable {
    schema: CollectionSchema,
    rows: BTreeMap<u64, Document>,
    ids: HashMap<String, u64>,
    next_seq: u64,
    /// field -> canonical value -> row sequence, for unique fields only
    unique_indexes: HashMap<String, HashMap<String, u64>>,
}

impl DocumentTable {
    pub fn new(schema: CollectionSchema) -> Self {
        let unique_indexes = schema
            .unique_fields()
            .map(|field| (field.name.clone(), HashMap::new()))
            .collect();
        Self {
            schema,
            rows: BTreeMap::new(),
            ids: HashMap::new(),
            next_seq: 0,
            unique_indexes,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn insert(&mut self, mut document: Document) -> Result<Document> {
        let id = match document.get(ID_FIELD).and_then(|v| v.as_str()) {
            Some(id) => id.to_string(),
            None => new_document_id(),
        };
        if self.ids.contains_key(&id) {
            return Err(CmsError::DuplicateKey {
                collection: self.schema.name.clone(),
                field: ID_FIELD.to_string(),
                value: format!("\"{}\"", id),
            });
        }
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        if self.schema.timestamps {
            let now = now_timestamp();
            document.insert(CREATED_AT_FIELD.to_string(), Value::String(now.clone()));
            document.insert(UPDATED_AT_FIELD.to_string(), Value::String(now));
        }

        self.check_uniqueness(&document, None)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.update_indexes(seq, &document);
        self.ids.insert(id, seq);
        self.rows.insert(seq, document.clone());
        Ok(document)
    }

    pub fn update(&mut self, id: &str, changes: Document) -> Result<Option<Document>> {
        let Some(&seq) = self.ids.get(id) else {
            return Ok(None);
        };
        let Some(current) = self.rows.get(&seq) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        for (key, value) in changes {
            if key == ID_FIELD || key == CREATED_AT_FIELD {
                continue;
            }
            updated.insert(key, value);
        }
        if self.schema.timestamps {
            updated.insert(UPDATED_AT_FIELD.to_string(), Value::String(now_timestamp()));
        }

        self.check_uniqueness(&updated, Some(seq))?;

        let previous = self.rows.insert(seq, updated.clone());
        if let Some(previous) = previous {
            self.remove_from_indexes(seq, &previous);
        }
        self.update_indexes(seq, &updated);
        Ok(Some(updated))
    }

    pub fn delete(&mut self, id: &str) -> Option<Document> {
        let seq = self.ids.remove(id)?;
        let removed = self.rows.remove(&seq)?;
        self.remove_from_indexes(seq, &removed);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.ids.get(id).and_then(|seq| self.rows.get(seq))
    }

    /// All rows with their insertion sequence.
    pub fn scan(&self) -> impl Iterator<Item = (u64, &Document)> {
        self.rows.iter().map(|(seq, doc)| (*seq, doc))
    }

    fn check_uniqueness(&self, document: &Document, ignore: Option<u64>) -> Result<()> {
        for (field, index) in &self.unique_indexes {
            let Some(value) = document.get(field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let key = value.to_string();
            if let Some(&owner) = index.get(&key)
                && Some(owner) != ignore
            {
                return Err(CmsError::DuplicateKey {
                    collection: self.schema.name.clone(),
                    field: field.clone(),
                    value: key,
                });
            }
        }
        Ok(())
    }

    fn update_indexes(&mut self, seq: u64, document: &Document) {
        for (field, index) in &mut self.unique_indexes {
            if let Some(value) = document.get(field)
                && !value.is_null()
            {
                index.insert(value.to_string(), seq);
            }
        }
    }

    fn remove_from_indexes(&mut self, seq: u64, document: &Document) {
        for (field, index) in &mut self.unique_indexes {
            if let Some(value) = document.get(field) {
                let key = value.to_string();
                if index.get(&key) == Some(&seq) {
                    index.remove(&key);
                }
            }
        }
    }
}
