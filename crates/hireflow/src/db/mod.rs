//! SQLite storage for candidates and prompt templates.
//!
//! [`Database`] is the crate's own [`CandidateRepository`](crate::collaborators::CandidateRepository):
//! every worker of every job holds a clone, and each repository write runs in
//! its own transaction so one item never rolls back another.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction};

pub mod candidate_repo;
pub mod error;
pub mod migrations;

pub use error::DatabaseError;

/// Shared handle to the candidate database.
///
/// Clones share one connection; calls from concurrent workers queue on its
/// mutex for the duration of a single statement or transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the candidate database at `path`, creating parent directories,
    /// and brings the schema up to date. File databases use WAL.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let db = Self::prepare(Connection::open(path)?, "PRAGMA journal_mode=WAL;")?;
        log::info!("Candidate database ready at {}", path.display());
        Ok(db)
    }

    /// A private in-memory database with the full schema, used by tests and
    /// dry runs.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?, "")
    }

    fn prepare(mut conn: Connection, pragmas: &str) -> Result<Self, DatabaseError> {
        // Child rows cascade with their candidate
        conn.execute_batch(&format!("{} PRAGMA foreign_keys=ON;", pragmas))?;
        migrations::run_all(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Runs read-only or single-statement work on the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` in a transaction that commits only if `f` succeeds.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, DatabaseError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Where the candidate database lives when the config names no path:
/// `~/.hireflow/data/hireflow.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".hireflow").join("data").join("hireflow.db"))
}
