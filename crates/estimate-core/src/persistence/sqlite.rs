use super::{PersistenceError, PersistenceResult, ProjectStore, STORAGE_KEY};
use crate::ProjectData;
use crate::migration::{restore_project, snapshot_value};
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Mutex, MutexGuard};

/// Key-value store with one row per storage key; the project lives under [`STORAGE_KEY`].
pub struct SqliteProjectStore {
    connection: Mutex<Connection>,
}

impl SqliteProjectStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                snapshot_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }

    /// Raw stored JSON, before any migration.
    pub fn load_raw(&self) -> PersistenceResult<Option<String>> {
        let conn = self.lock()?;
        let json = conn
            .query_row(
                "SELECT snapshot_json FROM snapshots WHERE key = ?1",
                params![STORAGE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(json)
    }

    /// Stores an arbitrary JSON document, e.g. a snapshot exported from an older build.
    pub fn save_raw(&self, json: &str) -> PersistenceResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (key, snapshot_json) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET snapshot_json = excluded.snapshot_json",
            params![STORAGE_KEY, json],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl ProjectStore for SqliteProjectStore {
    fn save_project(&self, project: &ProjectData) -> PersistenceResult<()> {
        let json = serde_json::to_string(&snapshot_value(project)?)?;
        self.save_raw(&json)
    }

    fn load_project(&self) -> PersistenceResult<Option<ProjectData>> {
        let Some(json) = self.load_raw()? else {
            return Ok(None);
        };
        let snapshot: serde_json::Value = serde_json::from_str(&json)?;
        restore_project(snapshot).map(Some)
    }
}
