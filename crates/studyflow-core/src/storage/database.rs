//! SQLite-backed snapshot storage.
//!
//! A single `kv` table holds the last known timer snapshot as a flat JSON
//! document. Writes are best-effort: the engine treats persistence as
//! fire-and-forget, so failures are logged here and never surfaced.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::data_dir;
use crate::engine::TimerState;
use crate::error::{CoreError, DatabaseError};

const SNAPSHOT_KEY: &str = "timer_state";

/// Durable, best-effort storage for the last known [`TimerState`].
///
/// `save` never fails from the caller's perspective; `load` is consulted
/// exactly once, during engine initialization.
pub trait SnapshotStore {
    fn save(&self, state: &TimerState);
    fn load(&self) -> Option<TimerState>;
}

/// SQLite database for host-side persistence.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/studyflow/studyflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studyflow.db");
        let conn = Connection::open(&path)
            .map_err(|source| DatabaseError::OpenFailed { path, source })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate().map_err(DatabaseError::from)?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate().map_err(DatabaseError::from)?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SnapshotStore for Database {
    fn save(&self, state: &TimerState) {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize timer snapshot");
                return;
            }
        };
        if let Err(e) = self.kv_set(SNAPSHOT_KEY, &json) {
            warn!(error = %e, "failed to persist timer snapshot");
        }
    }

    fn load(&self) -> Option<TimerState> {
        let json = match self.kv_get(SNAPSHOT_KEY) {
            Ok(value) => value?,
            Err(e) => {
                warn!(error = %e, "failed to read timer snapshot");
                return None;
            }
        };
        match serde_json::from_str(&json) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "discarding unreadable timer snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::Mode;

    #[test]
    fn kv_store_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "world").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "world");
    }

    #[test]
    fn snapshot_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert!(db.load().is_none());

        let mut state = TimerState::idle(Mode::ShortBreak, 300);
        state.is_paused = true;
        state.time_remaining_seconds = 120;
        state.completed_focus_sessions = 3;
        db.save(&state);
        assert_eq!(db.load().unwrap(), state);
    }

    #[test]
    fn unreadable_snapshot_loads_as_none() {
        let db = Database::open_memory().unwrap();
        db.kv_set(SNAPSHOT_KEY, "{garbage").unwrap();
        assert!(db.load().is_none());
    }
}
