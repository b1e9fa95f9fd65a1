use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{ensure_object, DbError, DocumentStore};

/// Registry of unique indexes, keyed `"{collection}\0{field}"`.
const INDEX_TREE: &str = "__unique_indexes";

/// Embedded on-disk document store: one sled tree per collection, documents
/// stored as JSON bytes.
///
/// Every unique index has its own tree mapping the encoded field value to the
/// id holding it. sled calls block, so they run on the blocking pool.
pub struct SledStore {
    db: sled::Db,
    // Serialises writers so a unique check and its write are not interleaved.
    write_lock: Mutex<()>,
}

#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Insert,
    Replace,
    Upsert,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let db = sled::open(path)?;
        Ok(Self::from_db(db))
    }

    /// Store backed by a throwaway database that is removed on drop.
    pub fn temporary() -> Result<Self, DbError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::from_db(db))
    }

    fn from_db(db: sled::Db) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    /// Run `work` against the database on the blocking pool
    async fn blocking<T, F>(&self, work: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&sled::Db) -> Result<T, DbError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || work(&db))
            .await
            .map_err(|e| DbError::Backend(format!("blocking task failed: {e}")))?
    }

    async fn write(
        &self,
        collection: &str,
        id: &str,
        document: Value,
        mode: WriteMode,
    ) -> Result<(), DbError> {
        ensure_object(&document)?;
        let collection = collection.to_string();
        let id = id.to_string();

        let _guard = self.write_lock.lock().await;
        self.blocking(move |db| put(db, &collection, &id, &document, mode))
            .await
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("trees", &self.db.tree_names().len())
            .finish()
    }
}

fn index_tree(db: &sled::Db, collection: &str, field: &str) -> Result<sled::Tree, DbError> {
    Ok(db.open_tree(format!("__unique\0{collection}\0{field}"))?)
}

fn unique_fields(db: &sled::Db, collection: &str) -> Result<Vec<String>, DbError> {
    let tree = db.open_tree(INDEX_TREE)?;
    let prefix = format!("{collection}\0");
    tree.scan_prefix(prefix.as_bytes())
        .map(|entry| -> Result<String, DbError> {
            let (key, _) = entry?;
            let key = String::from_utf8_lossy(&key);
            Ok(key[prefix.len()..].to_string())
        })
        .collect()
}

fn decode(bytes: Option<sled::IVec>) -> Result<Option<Value>, DbError> {
    bytes
        .map(|bytes| serde_json::from_slice(&bytes).map_err(DbError::from))
        .transpose()
}

/// The indexable value of `field`; nulls and missing fields are not indexed
fn indexed_value<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    document.get(field).filter(|value| !value.is_null())
}

/// Id of the document currently holding `value` in `field`, if any.
///
/// An entry pointing at a document that no longer carries the value (left by
/// an interrupted write) does not count.
fn holder(
    db: &sled::Db,
    collection: &str,
    field: &str,
    value: &Value,
) -> Result<Option<String>, DbError> {
    let index = index_tree(db, collection, field)?;
    let Some(owner) = index.get(serde_json::to_vec(value)?)? else {
        return Ok(None);
    };
    let document = decode(db.open_tree(collection)?.get(&owner)?)?;
    if document
        .as_ref()
        .and_then(|doc| doc.get(field))
        .is_some_and(|stored| stored == value)
    {
        Ok(Some(String::from_utf8_lossy(&owner).into_owned()))
    } else {
        Ok(None)
    }
}

fn check_unique(
    db: &sled::Db,
    collection: &str,
    fields: &[String],
    id: &str,
    document: &Value,
) -> Result<(), DbError> {
    for field in fields {
        let Some(value) = indexed_value(document, field) else {
            continue;
        };
        if holder(db, collection, field, value)?.is_some_and(|owner| owner != id) {
            return Err(DbError::UniqueViolation {
                collection: collection.to_string(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

/// Move the index entries of `id` from `previous` to `current`
fn reindex(
    db: &sled::Db,
    collection: &str,
    fields: &[String],
    id: &str,
    previous: Option<&Value>,
    current: Option<&Value>,
) -> Result<(), DbError> {
    for field in fields {
        let index = index_tree(db, collection, field)?;
        if let Some(old) = previous.and_then(|doc| indexed_value(doc, field)) {
            let key = serde_json::to_vec(old)?;
            if index.get(&key)?.is_some_and(|owner| &*owner == id.as_bytes()) {
                index.remove(key)?;
            }
        }
        if let Some(new) = current.and_then(|doc| indexed_value(doc, field)) {
            index.insert(serde_json::to_vec(new)?, id.as_bytes())?;
        }
    }
    Ok(())
}

fn put(
    db: &sled::Db,
    collection: &str,
    id: &str,
    document: &Value,
    mode: WriteMode,
) -> Result<(), DbError> {
    let tree = db.open_tree(collection)?;
    let previous = decode(tree.get(id.as_bytes())?)?;

    match (mode, &previous) {
        (WriteMode::Insert, Some(_)) => {
            return Err(DbError::DuplicateId {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }
        (WriteMode::Replace, None) => {
            return Err(DbError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }
        _ => {}
    }

    let fields = unique_fields(db, collection)?;
    check_unique(db, collection, &fields, id, document)?;

    tree.insert(id.as_bytes(), serde_json::to_vec(document)?)?;
    reindex(db, collection, &fields, id, previous.as_ref(), Some(document))?;
    db.flush()?;
    Ok(())
}

fn remove(db: &sled::Db, collection: &str, id: &str) -> Result<bool, DbError> {
    let tree = db.open_tree(collection)?;
    let Some(previous) = decode(tree.remove(id.as_bytes())?)? else {
        return Ok(false);
    };
    let fields = unique_fields(db, collection)?;
    reindex(db, collection, &fields, id, Some(&previous), None)?;
    db.flush()?;
    Ok(true)
}

fn add_unique_index(db: &sled::Db, collection: &str, field: &str) -> Result<(), DbError> {
    let index = index_tree(db, collection, field)?;
    for entry in db.open_tree(collection)?.iter() {
        let (id, bytes) = entry?;
        let document: Value = serde_json::from_slice(&bytes)?;
        let Some(value) = indexed_value(&document, field) else {
            continue;
        };
        let key = serde_json::to_vec(value)?;
        let id = String::from_utf8_lossy(&id).into_owned();
        match holder(db, collection, field, value)? {
            Some(owner) if owner != id => {
                return Err(DbError::UniqueViolation {
                    collection: collection.to_string(),
                    field: field.to_string(),
                })
            }
            _ => {
                index.insert(key, id.as_bytes())?;
            }
        }
    }

    db.open_tree(INDEX_TREE)?
        .insert(format!("{collection}\0{field}").as_bytes(), Vec::<u8>::new())?;
    db.flush()?;
    Ok(())
}

fn find(
    db: &sled::Db,
    collection: &str,
    field: &str,
    value: &Value,
) -> Result<Option<Value>, DbError> {
    let tree = db.open_tree(collection)?;

    if unique_fields(db, collection)?.iter().any(|f| f == field) {
        return match holder(db, collection, field, value)? {
            Some(owner) => decode(tree.get(owner.as_bytes())?),
            None => Ok(None),
        };
    }

    for entry in tree.iter() {
        let (_, bytes) = entry?;
        let doc: Value = serde_json::from_slice(&bytes)?;
        if doc.get(field) == Some(value) {
            return Ok(Some(doc));
        }
    }
    Ok(None)
}

#[async_trait]
impl DocumentStore for SledStore {
    fn backend(&self) -> &'static str {
        "sled"
    }

    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError> {
        self.write(collection, id, document, WriteMode::Insert).await
    }

    async fn replace(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError> {
        self.write(collection, id, document, WriteMode::Replace)
            .await
    }

    async fn upsert(&self, collection: &str, id: &str, document: Value) -> Result<(), DbError> {
        self.write(collection, id, document, WriteMode::Upsert).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, DbError> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.blocking(move |db| decode(db.open_tree(collection)?.get(id.as_bytes())?))
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DbError> {
        let collection = collection.to_string();
        let id = id.to_string();

        let _guard = self.write_lock.lock().await;
        self.blocking(move |db| remove(db, &collection, &id)).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, DbError> {
        let collection = collection.to_string();
        self.blocking(move |db| {
            db.open_tree(collection)?
                .iter()
                .map(|entry| -> Result<Value, DbError> {
                    let (_, bytes) = entry?;
                    Ok(serde_json::from_slice(&bytes)?)
                })
                .collect()
        })
        .await
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>, DbError> {
        let collection = collection.to_string();
        let field = field.to_string();
        let value = value.clone();
        self.blocking(move |db| find(db, &collection, &field, &value))
            .await
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), DbError> {
        let collection = collection.to_string();
        let field = field.to_string();

        let _guard = self.write_lock.lock().await;
        self.blocking(move |db| add_unique_index(db, &collection, &field))
            .await
    }
}
