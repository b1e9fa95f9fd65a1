use thiserror::Error;

/// Errors raised by document store backends.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("unsupported database url '{0}'; expected memory:// or sled://<path>")]
    UnsupportedUrl(String),

    #[error("document '{id}' already exists in '{collection}'")]
    DuplicateId { collection: String, id: String },

    #[error("document '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("duplicate value for unique field '{field}' in '{collection}'")]
    UniqueViolation { collection: String, field: String },

    #[error("documents must be JSON objects")]
    InvalidDocument,

    #[error("failed to convert document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend failed: {0}")]
    Backend(String),
}

impl From<sled::Error> for DbError {
    fn from(error: sled::Error) -> Self {
        DbError::Backend(error.to_string())
    }
}
