pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod reservations;

pub use error::{ParkingError, ParkingResult};

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Persistence context for users, slots and vehicle entries.
///
/// One connection behind a mutex: every read-modify-write runs while holding
/// the lock and inside an immediate transaction, so transitions on the same
/// slot never interleave.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> ParkingResult<T>
    where
        F: FnOnce(&Connection) -> ParkingResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ParkingError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> ParkingResult<T>
    where
        F: FnOnce(&mut Connection) -> ParkingResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ParkingError::Poisoned(e.to_string()))?;
        f(&mut conn)
    }
}
