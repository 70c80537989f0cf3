use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::entity::{timestamp_now, Note, NoteInput};
use crate::error::{NoteboxError, Result};

const NOTE_COLUMNS: &str = "id, title, content, note_group, created_at, updated_at";

/// SQLite-backed note store. Owns id assignment, timestamps and validation.
pub struct NoteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl NoteStore {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let store = Self { conn, path: None };
        store.init_schema()?;
        Ok(store)
    }

    /// Location of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                note_group TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at)",
            [],
        )?;

        Ok(())
    }

    /// All notes, newest created first
    pub fn list(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY created_at DESC, rowid DESC"
        ))?;

        let notes = stmt
            .query_map([], note_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                [id.to_string()],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// Validate and persist a new note
    pub fn create(&self, input: NoteInput) -> Result<Note> {
        let note = Note::new(input.validate()?);

        self.conn.execute(
            &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                note.id.to_string(),
                note.title,
                note.content,
                note.group,
                format_timestamp(&note.created_at),
                format_timestamp(&note.updated_at),
            ],
        )?;

        tracing::debug!(id = %note.id, "note created");
        Ok(note)
    }

    /// Replace title, content and group of an existing note
    pub fn update(&self, id: &Uuid, input: NoteInput) -> Result<Note> {
        let input = input.validate()?;
        let now = timestamp_now();

        let changed = self.conn.execute(
            "UPDATE notes SET title = ?1, content = ?2, note_group = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                input.title,
                input.content,
                input.group,
                format_timestamp(&now),
                id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(NoteboxError::NotFound(id.to_string()));
        }

        tracing::debug!(%id, "note updated");
        self.get(id)?
            .ok_or_else(|| NoteboxError::NotFound(id.to_string()))
    }

    pub fn delete(&self, id: &Uuid) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", [id.to_string()])?;

        if removed == 0 {
            return Err(NoteboxError::NotFound(id.to_string()));
        }

        tracing::debug!(%id, "note deleted");
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Fixed-width RFC 3339 so that text order matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;

    Ok(Note {
        id,
        title: row.get(1)?,
        content: row.get(2)?,
        group: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
        updated_at: parse_timestamp(5, &updated_at)?,
    })
}

impl From<rusqlite::Error> for NoteboxError {
    fn from(e: rusqlite::Error) -> Self {
        NoteboxError::Storage(format!("SQLite error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn input(title: &str) -> NoteInput {
        NoteInput::new(title, format!("{} body", title))
    }

    #[test]
    fn test_open_creates_db() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("notes.db");
        let store = NoteStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_create_and_get() {
        let store = NoteStore::open_in_memory().unwrap();

        let created = store
            .create(NoteInput::new(" Shopping ", "eggs").with_group("home"))
            .unwrap();
        assert_eq!(created.title, "Shopping");
        assert_eq!(created.group, Some("home".to_string()));

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = NoteStore::open_in_memory().unwrap();
        assert!(store.get(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_create_rejects_empty_fields_without_persisting() {
        let store = NoteStore::open_in_memory().unwrap();

        let result = store.create(NoteInput::new("", "content"));
        assert!(matches!(result, Err(NoteboxError::Validation(_))));

        let result = store.create(NoteInput::new("title", "  "));
        assert!(matches!(result, Err(NoteboxError::Validation(_))));

        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_list_newest_first() {
        let store = NoteStore::open_in_memory().unwrap();

        let first = store.create(input("first")).unwrap();
        let second = store.create(input("second")).unwrap();
        let third = store.create(input("third")).unwrap();

        let ids: Vec<Uuid> = store.list().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[test]
    fn test_update_replaces_fields_and_refreshes_updated_at() {
        let store = NoteStore::open_in_memory().unwrap();
        let created = store
            .create(NoteInput::new("draft", "v1").with_group("work"))
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));

        // group omitted: full replace clears it
        let updated = store
            .update(&created.id, NoteInput::new("final", "v2"))
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "final");
        assert_eq!(updated.content, "v2");
        assert_eq!(updated.group, None);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[test]
    fn test_update_missing_is_not_found_and_creates_nothing() {
        let store = NoteStore::open_in_memory().unwrap();

        let result = store.update(&Uuid::new_v4(), input("ghost"));
        assert!(matches!(result, Err(NoteboxError::NotFound(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_update_validates_input() {
        let store = NoteStore::open_in_memory().unwrap();
        let created = store.create(input("keep")).unwrap();

        let result = store.update(&created.id, NoteInput::new("", ""));
        assert!(matches!(result, Err(NoteboxError::Validation(_))));

        let unchanged = store.get(&created.id).unwrap().unwrap();
        assert_eq!(unchanged, created);
    }

    #[test]
    fn test_delete_twice_is_not_found() {
        let store = NoteStore::open_in_memory().unwrap();
        let created = store.create(input("gone")).unwrap();

        store.delete(&created.id).unwrap();
        assert!(store.get(&created.id).unwrap().is_none());

        let result = store.delete(&created.id);
        assert!(matches!(result, Err(NoteboxError::NotFound(_))));
    }

    #[test]
    fn test_reopen_keeps_notes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.db");

        let created = {
            let store = NoteStore::open(&path).unwrap();
            store.create(input("persisted")).unwrap()
        };

        let store = NoteStore::open(&path).unwrap();
        let notes = store.list().unwrap();
        assert_eq!(notes, vec![created]);
    }
}
