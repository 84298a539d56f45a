//! SQLite docstore: entry text and metadata keyed by entry id

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::memory::{EntryKind, MemoryEntry};

const ENTRY_COLUMNS: &str = "id, kind, statement_id, position, content, created_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage
    pub fn new(config: &Config) -> Result<Self> {
        let conn = Connection::open(config.sqlite_path())?;

        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Save entries in a single transaction
    pub fn save_entries(&self, entries: &[MemoryEntry]) -> Result<()> {
        let mut conn = self.conn.lock().map_err(|e| Error::storage(e.to_string()))?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (id, kind, statement_id, position, content, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            for entry in entries {
                stmt.execute(params![
                    entry.id.to_string(),
                    entry.kind.to_string(),
                    entry.statement_id.to_string(),
                    entry.position,
                    entry.content,
                    entry.created_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get an entry by ID
    pub fn get_entry(&self, id: Uuid) -> Result<Option<MemoryEntry>> {
        let conn = self.conn.lock().map_err(|e| Error::storage(e.to_string()))?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS),
                params![id.to_string()],
                EntryRow::from_row,
            )
            .optional()?;

        row.map(EntryRow::into_entry).transpose()
    }

    /// Look up entries by id, keeping the order of `ids` and skipping unknown ids
    pub fn get_entries(&self, ids: &[Uuid]) -> Result<Vec<MemoryEntry>> {
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_entry(*id)? {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(%id, "vector hit has no docstore entry"),
            }
        }
        Ok(entries)
    }

    /// All entries in insertion order
    pub fn list_entries(&self) -> Result<Vec<MemoryEntry>> {
        let conn = self.conn.lock().map_err(|e| Error::storage(e.to_string()))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entries ORDER BY rowid",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map([], EntryRow::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }

        Ok(entries)
    }

    /// Count entries, optionally only those of one kind
    pub fn count(&self, kind: Option<EntryKind>) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| Error::storage(e.to_string()))?;

        let count: i64 = match kind {
            Some(kind) => conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE kind = ?1",
                params![kind.to_string()],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?,
        };

        Ok(count as usize)
    }

    /// Delete every entry
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| Error::storage(e.to_string()))?;
        conn.execute("DELETE FROM entries", [])?;
        Ok(())
    }
}

/// Intermediate struct for reading from SQLite
struct EntryRow {
    id: String,
    kind: String,
    statement_id: String,
    position: u32,
    content: String,
    created_at: String,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            statement_id: row.get(2)?,
            position: row.get(3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_entry(self) -> Result<MemoryEntry> {
        let kind = match self.kind.as_str() {
            "statement" => EntryKind::Statement,
            "placeholder" => EntryKind::Placeholder,
            _ => return Err(Error::storage(format!("Unknown entry kind: {}", self.kind))),
        };

        Ok(MemoryEntry {
            id: Uuid::parse_str(&self.id).map_err(|e| Error::storage(e.to_string()))?,
            kind,
            statement_id: Uuid::parse_str(&self.statement_id)
                .map_err(|e| Error::storage(e.to_string()))?,
            position: self.position,
            content: self.content,
            embedding: None,
            created_at: chrono::DateTime::parse_from_rfc3339(&self.created_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| Error::storage(e.to_string()))?,
        })
    }
}
