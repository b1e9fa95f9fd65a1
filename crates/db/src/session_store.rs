use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};

use crate::{DbError, DocumentStore};

/// Collection holding one document per live session.
pub const SESSIONS_COLLECTION: &str = "sessions";

/// Session store persisting `tower-sessions` records in the document store.
///
/// Saves that leave the session data untouched and push the expiry forward by
/// less than `touch_after` are skipped, so browsing does not rewrite the
/// session document on every request.
#[derive(Clone)]
pub struct DocumentSessionStore {
    store: Arc<dyn DocumentStore>,
    touch_after: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionDocument {
    id: String,
    data: HashMap<String, Value>,
    expires_at: i64,
}

impl DocumentSessionStore {
    pub fn new(store: Arc<dyn DocumentStore>, touch_after: Duration) -> Self {
        Self { store, touch_after }
    }

    async fn read(&self, id: &str) -> session_store::Result<Option<SessionDocument>> {
        match self
            .store
            .get(SESSIONS_COLLECTION, id)
            .await
            .map_err(backend)?
        {
            Some(document) => serde_json::from_value(document)
                .map(Some)
                .map_err(|e| session_store::Error::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    async fn write(&self, record: &Record) -> session_store::Result<()> {
        let id = record.id.to_string();
        let document = SessionDocument {
            id: id.clone(),
            data: record.data.clone(),
            expires_at: record.expiry_date.unix_timestamp(),
        };
        let document =
            serde_json::to_value(document).map_err(|e| session_store::Error::Encode(e.to_string()))?;

        self.store
            .upsert(SESSIONS_COLLECTION, &id, document)
            .await
            .map_err(backend)
    }
}

impl std::fmt::Debug for DocumentSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSessionStore")
            .field("backend", &self.store.backend())
            .field("touch_after", &self.touch_after)
            .finish()
    }
}

fn backend(error: DbError) -> session_store::Error {
    session_store::Error::Backend(error.to_string())
}

#[async_trait]
impl SessionStore for DocumentSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.read(&record.id.to_string()).await?.is_some() {
            record.id = Id::default();
        }
        self.write(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        if let Some(stored) = self.read(&record.id.to_string()).await? {
            let extension = record.expiry_date.unix_timestamp() - stored.expires_at;
            if stored.data == record.data && extension < self.touch_after.whole_seconds() {
                tracing::trace!(target: "yelpcamp-db", "session touch skipped");
                return Ok(());
            }
        }
        self.write(record).await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let key = session_id.to_string();
        let Some(stored) = self.read(&key).await? else {
            return Ok(None);
        };

        let expiry_date = OffsetDateTime::from_unix_timestamp(stored.expires_at)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        if expiry_date <= OffsetDateTime::now_utc() {
            self.store
                .delete(SESSIONS_COLLECTION, &key)
                .await
                .map_err(backend)?;
            return Ok(None);
        }

        Ok(Some(Record {
            id: *session_id,
            data: stored.data,
            expiry_date,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.store
            .delete(SESSIONS_COLLECTION, &session_id.to_string())
            .await
            .map_err(backend)?;
        Ok(())
    }
}
