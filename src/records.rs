//! Local test records.
//!
//! Records live as YAML files under `.caseport/records/<id>.yaml`. The import
//! engine only needs [`RecordSource::load`]; listing and saving are used by
//! the CLI.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::caseport_root;
use crate::error::{CaseportError, Result};
use crate::import::LocalTestRecord;

/// Where the engine looks up records by id.
pub trait RecordSource: Send + Sync {
    fn load(&self, id: &str) -> Result<LocalTestRecord>;
}

/// Directory of YAML record files.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CaseportError::InvalidRecord(format!(
            "record id '{id}' may only contain letters, digits, '-' and '_'"
        )))
    }
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the caseport root.
    pub fn open_default() -> Self {
        Self::new(caseport_root().join("records"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.yaml")))
    }

    /// Ids of all stored records, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && validate_id(stem).is_ok()
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn save(&self, id: &str, record: &LocalTestRecord) -> Result<PathBuf> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_yaml_ng::to_string(record)?)?;
        Ok(path)
    }
}

impl RecordSource for RecordStore {
    fn load(&self, id: &str) -> Result<LocalTestRecord> {
        let path = self.path_for(id)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CaseportError::RecordNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let record: LocalTestRecord = serde_yaml_ng::from_str(&content).map_err(|e| {
            CaseportError::InvalidRecord(format!("{}: {e}", path.display()))
        })?;
        Ok(record)
    }
}
