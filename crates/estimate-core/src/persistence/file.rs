use super::{PersistenceResult, ProjectStore};
use crate::ProjectData;
use crate::migration::{PersistedSnapshot, restore_project};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

pub fn save_project_to_json<P: AsRef<Path>>(project: &ProjectData, path: P) -> PersistenceResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let snapshot = PersistedSnapshot::current(project.clone());
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &snapshot)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), "saved project snapshot");
    Ok(())
}

/// Reads a snapshot in any accepted envelope and upgrades it to the current schema.
pub fn load_project_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ProjectData> {
    let file = File::open(path)?;
    let snapshot: Value = serde_json::from_reader(BufReader::new(file))?;
    restore_project(snapshot)
}

/// Keeps the single project snapshot in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProjectStore for JsonFileStore {
    fn save_project(&self, project: &ProjectData) -> PersistenceResult<()> {
        save_project_to_json(project, &self.path)
    }

    fn load_project(&self) -> PersistenceResult<Option<ProjectData>> {
        match load_project_from_json(&self.path) {
            Ok(project) => Ok(Some(project)),
            Err(super::PersistenceError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}
