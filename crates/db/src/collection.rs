use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{DbError, DocumentStore};

/// A domain type stored as one document in a named collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    pub async fn insert(&self, item: &T) -> Result<(), DbError> {
        let document = serde_json::to_value(item)?;
        self.store.insert(T::COLLECTION, item.id(), document).await
    }

    pub async fn replace(&self, item: &T) -> Result<(), DbError> {
        let document = serde_json::to_value(item)?;
        self.store.replace(T::COLLECTION, item.id(), document).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, DbError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<bool, DbError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn list(&self) -> Result<Vec<T>, DbError> {
        self.store
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(DbError::from))
            .collect()
    }

    pub async fn find_by<V: Serialize>(&self, field: &str, value: V) -> Result<Option<T>, DbError> {
        let value = serde_json::to_value(value)?;
        match self.store.find_one(T::COLLECTION, field, &value).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }
}
