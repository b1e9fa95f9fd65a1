//! Document store for YelpCamp.
//!
//! Documents are JSON objects grouped into named collections and keyed by id.
//! Two backends implement [`DocumentStore`]: [`MemoryStore`] for tests and
//! throwaway runs, and [`SledStore`] for an embedded on-disk database. The
//! backend is picked from the database URL by [`connect`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

mod collection;
mod error;
mod memory;
mod session_store;
mod sled_store;

pub use collection::{Collection, Document};
pub use error::DbError;
pub use memory::MemoryStore;
pub use session_store::{DocumentSessionStore, SESSIONS_COLLECTION};
pub use sled_store::SledStore;

/// Operations every document store backend provides.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Insert a new document. Fails if the id is taken or a unique index would be violated.
    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError>;

    /// Overwrite an existing document. Fails with [`DbError::NotFound`] if `id` is absent,
    /// so a stale copy cannot bring a deleted document back.
    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError>;

    /// Insert or overwrite the document stored under `id`.
    async fn upsert(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DbError>;

    /// Remove a document, returning whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DbError>;

    /// All documents of a collection in id order.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, DbError>;

    /// First document (in id order) whose top-level `field` equals `value`.
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>, DbError>;

    /// Enforce uniqueness of a top-level field from now on. Idempotent.
    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), DbError>;
}

/// Open the backend named by `url`: `memory://` or `sled://<path>`.
pub fn connect(url: &str) -> Result<Arc<dyn DocumentStore>, DbError> {
    if url == "memory://" || url == "memory" {
        tracing::info!(target: "yelpcamp-db", backend = "memory", "document store ready");
        return Ok(Arc::new(MemoryStore::new()));
    }

    if let Some(path) = url.strip_prefix("sled://") {
        if path.is_empty() {
            return Err(DbError::UnsupportedUrl(url.to_string()));
        }
        let store = SledStore::open(path)?;
        tracing::info!(target: "yelpcamp-db", backend = "sled", path, "document store ready");
        return Ok(Arc::new(store));
    }

    Err(DbError::UnsupportedUrl(url.to_string()))
}

/// Returns the first unique field for which `document` collides with a
/// different document among `existing`.
pub(crate) fn unique_conflict<'a, I>(
    fields: &[String],
    id: &str,
    document: &Value,
    existing: I,
) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    if fields.is_empty() {
        return None;
    }
    let existing: Vec<(&str, &Value)> = existing.into_iter().collect();

    fields.iter().find_map(|field| {
        let candidate = document.get(field)?;
        if candidate.is_null() {
            return None;
        }
        existing
            .iter()
            .any(|(other_id, other)| *other_id != id && other.get(field) == Some(candidate))
            .then(|| field.clone())
    })
}

pub(crate) fn ensure_object(document: &Value) -> Result<(), DbError> {
    if document.is_object() {
        Ok(())
    } else {
        Err(DbError::InvalidDocument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connect_picks_backend_from_url() {
        assert_eq!(connect("memory://").unwrap().backend(), "memory");

        let dir = tempfile::tempdir().unwrap();
        let url = format!("sled://{}", dir.path().join("db").display());
        assert_eq!(connect(&url).unwrap().backend(), "sled");
    }

    #[test]
    fn connect_rejects_other_schemes() {
        let err = connect("mongodb://localhost:27017/yelp-camp").err().unwrap();
        assert!(matches!(err, DbError::UnsupportedUrl(_)));
        assert!(matches!(connect("sled://").err().unwrap(), DbError::UnsupportedUrl(_)));
    }

    #[test]
    fn unique_conflict_ignores_the_document_itself() {
        let fields = vec!["username".to_string()];
        let a = json!({"username": "tim"});
        let existing = vec![("1", &a)];

        assert_eq!(unique_conflict(&fields, "1", &a, existing.clone()), None);
        assert_eq!(
            unique_conflict(&fields, "2", &json!({"username": "tim"}), existing.clone()),
            Some("username".to_string())
        );
        assert_eq!(
            unique_conflict(&fields, "2", &json!({"username": "sam"}), existing),
            None
        );
    }
}
