//! SQLite-backed seen store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{SeenEntry, SeenStore, SeenStoreError};
use crate::matcher::MatchKey;
use crate::provider::Show;

/// SQLite-backed seen store.
pub struct SqliteSeenStore {
    conn: Mutex<Connection>,
}

impl SqliteSeenStore {
    /// Open the store, creating the database file and table if needed.
    pub fn new(path: &Path) -> Result<Self, SeenStoreError> {
        let conn = Connection::open(path).map_err(|e| SeenStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, SeenStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SeenStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SeenStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS seen_shows (
                match_key TEXT PRIMARY KEY,
                provider TEXT NOT NULL,
                show_id TEXT NOT NULL,
                destination TEXT NOT NULL,
                show_blob BLOB NOT NULL,
                first_seen_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_seen_shows_provider ON seen_shows(provider);
            "#,
        )
        .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        Ok(())
    }
}

impl SeenStore for SqliteSeenStore {
    fn contains(&self, key: &MatchKey) -> Result<bool, SeenStoreError> {
        let conn = self.conn.lock().unwrap();

        let found = conn
            .query_row(
                "SELECT 1 FROM seen_shows WHERE match_key = ?",
                params![key.as_str()],
                |_| Ok(true),
            )
            .optional()
            .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        Ok(found.unwrap_or(false))
    }

    fn insert(&self, show: &Show, destination: &str) -> Result<bool, SeenStoreError> {
        let blob = show.to_bytes()?;
        let key = show.match_key();
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "INSERT OR IGNORE INTO seen_shows
                 (match_key, provider, show_id, destination, show_blob, first_seen_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    key.as_str(),
                    &show.provider,
                    &show.id,
                    destination,
                    blob,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    fn keys(&self) -> Result<Vec<MatchKey>, SeenStoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT match_key FROM seen_shows ORDER BY first_seen_at, match_key")
            .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        let mut keys = Vec::new();
        for row in rows {
            let key = row.map_err(|e| SeenStoreError::Database(e.to_string()))?;
            keys.push(MatchKey::from_raw(key));
        }
        Ok(keys)
    }

    fn get(&self, key: &MatchKey) -> Result<Option<SeenEntry>, SeenStoreError> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT destination, show_blob, first_seen_at FROM seen_shows WHERE match_key = ?",
                params![key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        let Some((destination, blob, first_seen_at)) = row else {
            return Ok(None);
        };

        let first_seen_at = DateTime::parse_from_rfc3339(&first_seen_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(SeenEntry {
            match_key: key.clone(),
            show: Show::from_bytes(&blob)?,
            destination,
            first_seen_at,
        }))
    }

    fn count(&self) -> Result<u64, SeenStoreError> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM seen_shows", [], |row| row.get(0))
            .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        Ok(count as u64)
    }

    fn clear(&self) -> Result<(), SeenStoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM seen_shows", [])
            .map_err(|e| SeenStoreError::Database(e.to_string()))?;

        Ok(())
    }
}
