use crate::ProjectData;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

/// Key the snapshot is stored under in key-value backends.
pub const STORAGE_KEY: &str = "project-estimator-storage";

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    InvalidData(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Serialization(err) => Some(err),
            PersistenceError::Io(err) => Some(err),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => Some(err),
            PersistenceError::Csv(err) => Some(err),
            PersistenceError::InvalidData(_) => None,
        }
    }
}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Opaque blob store holding at most one project snapshot.
pub trait ProjectStore: Send + Sync {
    fn save_project(&self, project: &ProjectData) -> PersistenceResult<()>;
    /// Loads and migrates the stored snapshot, or `None` when nothing was saved yet.
    fn load_project(&self) -> PersistenceResult<Option<ProjectData>>;
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod tabular;

pub use file::{JsonFileStore, load_project_from_json, save_project_to_json};
pub use tabular::{
    export_chapters_to_csv, import_chapters_from_csv, load_chapters_from_csv,
    save_chapters_to_csv, write_csv_template,
};
