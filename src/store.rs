// src/store.rs
use crate::ledger::{LogEntry, Plan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DATA_DIR: &str = "workout-planner-cli";
const PLANS_DOC: &str = "plans";
const LOGS_DOC: &str = "logs";

/// Version stamped into exported backups.
pub const EXPORT_VERSION: u32 = 2;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not determine application data directory.")]
    DataDir,
    #[error("I/O error accessing data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode stored data (JSON): {0}")]
    Decode(serde_json::Error),
    #[error("Failed to encode data (JSON): {0}")]
    Encode(serde_json::Error),
}

/// Gets the default directory for the data documents within the user's
/// data directory. Exposed at crate root as `get_data_dir_util`.
pub fn get_data_dir() -> Result<PathBuf, Error> {
    let data_dir = dirs::data_dir().ok_or(Error::DataDir)?;
    Ok(data_dir.join(APP_DATA_DIR))
}

/// Full import/export payload. `plans` and `logs` are required on import;
/// `version` and `exportedAt` are stamped on export but tolerated missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    pub plans: Vec<Plan>,
    pub logs: Vec<LogEntry>,
}

fn default_version() -> u32 {
    EXPORT_VERSION
}

/// Serializes a backup payload as pretty JSON for an export file.
/// # Errors
/// Returns `Error::Encode` if serialization fails.
pub fn encode_backup(backup: &Backup) -> Result<String, Error> {
    serde_json::to_string_pretty(backup).map_err(Error::Encode)
}

/// Parses an import payload. Anything without both a `plans` and a `logs`
/// field is rejected here.
/// # Errors
/// Returns `Error::Decode` if the payload is not a valid backup document.
pub fn decode_backup(json: &str) -> Result<Backup, Error> {
    serde_json::from_str(json).map_err(Error::Decode)
}

/// String-keyed store of whole JSON documents, one file per document,
/// overwritten in full on every save. The two documents it actually
/// holds are the plan collection and the log collection.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    /// # Errors
    /// Returns `Error::Io` if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Reads a document's raw contents, `None` if it does not exist.
    /// # Errors
    /// Returns `Error::Io` on read failure.
    pub fn read(&self, name: &str) -> Result<Option<String>, Error> {
        let path = self.document_path(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// Overwrites a document in full.
    /// # Errors
    /// Returns `Error::Io` on write failure.
    pub fn write(&self, name: &str, contents: &str) -> Result<(), Error> {
        fs::write(self.document_path(name), contents)?;
        Ok(())
    }

    /// Removes a document; missing documents are fine.
    /// # Errors
    /// Returns `Error::Io` on removal failure.
    pub fn remove(&self, name: &str) -> Result<(), Error> {
        let path = self.document_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Loads the plan collection. An absent document is an empty
    /// collection; a document that fails to parse is `Error::Decode`,
    /// left to the caller to map (the application falls back to empty).
    /// # Errors
    /// Returns `Error::Io` or `Error::Decode`.
    pub fn load_plans(&self) -> Result<Vec<Plan>, Error> {
        match self.read(PLANS_DOC)? {
            Some(contents) => serde_json::from_str(&contents).map_err(Error::Decode),
            None => Ok(Vec::new()),
        }
    }

    /// Loads the log collection, with the same absent/malformed contract
    /// as `load_plans`.
    /// # Errors
    /// Returns `Error::Io` or `Error::Decode`.
    pub fn load_logs(&self) -> Result<Vec<LogEntry>, Error> {
        match self.read(LOGS_DOC)? {
            Some(contents) => serde_json::from_str(&contents).map_err(Error::Decode),
            None => Ok(Vec::new()),
        }
    }

    /// Writes the full plan collection.
    /// # Errors
    /// Returns `Error::Io` or `Error::Encode`.
    pub fn save_plans(&self, plans: &[Plan]) -> Result<(), Error> {
        let contents = serde_json::to_string(plans).map_err(Error::Encode)?;
        self.write(PLANS_DOC, &contents)
    }

    /// Writes the full log collection.
    /// # Errors
    /// Returns `Error::Io` or `Error::Encode`.
    pub fn save_logs(&self, logs: &[LogEntry]) -> Result<(), Error> {
        let contents = serde_json::to_string(logs).map_err(Error::Encode)?;
        self.write(LOGS_DOC, &contents)
    }

    /// Removes both documents.
    /// # Errors
    /// Returns `Error::Io` on removal failure.
    pub fn clear(&self) -> Result<(), Error> {
        self.remove(PLANS_DOC)?;
        self.remove(LOGS_DOC)
    }
}
