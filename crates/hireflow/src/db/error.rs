use std::path::PathBuf;

use thiserror::Error;

/// Failures of the SQLite candidate store.
///
/// Repository calls surface these to item processors as
/// [`CollaboratorError`](crate::error::CollaboratorError)s at the persistence stage.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// A worker panicked while holding the connection.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// The candidate or prompt template does not exist or is inactive.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// An embedding or metadata column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
