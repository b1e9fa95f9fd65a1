use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{ensure_object, unique_conflict, DbError, DocumentStore};

/// In-process document store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    unique_fields: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn check_unique(&self, collection: &str, id: &str, document: &Value) -> Result<(), DbError> {
        let Some(fields) = self.unique_fields.get(collection) else {
            return Ok(());
        };
        let existing = self
            .collections
            .get(collection)
            .into_iter()
            .flat_map(|docs| docs.iter().map(|(k, v)| (k.as_str(), v)));

        match unique_conflict(fields, id, document, existing) {
            Some(field) => Err(DbError::UniqueViolation {
                collection: collection.to_string(),
                field,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError> {
        ensure_object(&document)?;
        let mut inner = self.inner.write().await;

        if inner
            .collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id))
        {
            return Err(DbError::DuplicateId {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        inner.check_unique(collection, id, &document)?;

        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError> {
        ensure_object(&document)?;
        let mut inner = self.inner.write().await;

        if !inner
            .collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id))
        {
            return Err(DbError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        inner.check_unique(collection, id, &document)?;

        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn upsert(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError> {
        ensure_object(&document)?;
        let mut inner = self.inner.write().await;
        inner.check_unique(collection, id, &document)?;

        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DbError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>, DbError> {
        let inner = self.inner.read().await;
        Ok(inner.collections.get(collection).and_then(|docs| {
            docs.values()
                .find(|doc| doc.get(field) == Some(value))
                .cloned()
        }))
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), DbError> {
        let mut inner = self.inner.write().await;
        let fields = inner
            .unique_fields
            .entry(collection.to_string())
            .or_default();
        if !fields.iter().any(|existing| existing == field) {
            fields.push(field.to_string());
        }
        Ok(())
    }
}
