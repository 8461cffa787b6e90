//! The remote `recipes` collection
//!
//! The store talks to durable storage only through [`RecipeCollection`], a
//! generic CRUD surface:
//! - select all, newest first
//! - insert a batch (rejects existing ids)
//! - update fields by id
//! - delete by id
//! - upsert a batch (insert or replace by id)
//!
//! [`SqliteCollection`] is the bundled implementation.

mod schema;
mod sqlite;

pub use sqlite::SqliteCollection;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::identity::RecipeId;
use crate::entities::{Recipe, RecipeFields};

/// Result type for remote collection calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Async CRUD surface over the `recipes` collection
#[async_trait]
pub trait RecipeCollection: Send + Sync {
    /// All recipes ordered by creation time, newest first
    async fn select_all(&self) -> RemoteResult<Vec<Recipe>>;

    /// Insert new records; fails if any id already exists
    async fn insert(&self, records: &[Recipe]) -> RemoteResult<()>;

    /// Overwrite the editable fields of the record with this id
    ///
    /// Updating an id that does not exist is not an error.
    async fn update(&self, id: &RecipeId, fields: &RecipeFields) -> RemoteResult<()>;

    /// Delete the record with this id, if present
    async fn delete(&self, id: &RecipeId) -> RemoteResult<()>;

    /// Insert records, replacing any existing record with the same id
    async fn upsert(&self, records: &[Recipe]) -> RemoteResult<()>;
}

/// Errors from the remote collection
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("recipe '{0}' already exists")]
    Conflict(String),

    #[error("malformed record '{id}': {message}")]
    Decode { id: String, message: String },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported schema version {found} (this build understands {expected})")]
    SchemaVersion { found: i32, expected: i32 },

    #[error("remote collection unavailable: {0}")]
    Unavailable(String),
}
