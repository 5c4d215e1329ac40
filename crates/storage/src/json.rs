//! JSON file history sink.
//!
//! The file holds a single pretty-printed JSON array of [`Record`]s so the
//! history can be inspected or post-processed with ordinary tools.

use crate::{HistorySink, Record, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// History sink backed by a JSON array file.
#[derive(Debug, Clone)]
pub struct JsonHistory {
    path: PathBuf,
}

impl JsonHistory {
    /// Open a history file, creating it as an empty array if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, "[]")?;
            debug!(path = %path.display(), "created history file");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Record>> {
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }
}

impl HistorySink for JsonHistory {
    fn append(&self, record: &Record) -> Result<()> {
        let mut records = self.read()?;
        records.push(record.clone());
        let data = serde_json::to_string_pretty(&records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<Record>> {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, TurnId, Usage};

    #[test]
    fn open_creates_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat_history.json");
        let history = JsonHistory::open(&path).unwrap();
        assert_eq!(fs::read_to_string(history.path()).unwrap(), "[]");
        assert!(history.records().unwrap().is_empty());
    }

    #[test]
    fn append_preserves_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");
        let turn = TurnId::new();

        JsonHistory::open(&path)
            .unwrap()
            .append(&Record::new(turn, Role::User, "first", "m", Usage::input(1)))
            .unwrap();
        let history = JsonHistory::open(&path).unwrap();
        history
            .append(&Record::new(turn, Role::Assistant, "second", "m", Usage::new(0, 1)))
            .unwrap();

        let records = history.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "first");
        assert_eq!(records[1].content, "second");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[1]["usage"]["output_tokens"], 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");
        fs::write(&path, "{not json").unwrap();
        let history = JsonHistory::open(&path).unwrap();
        let record = Record::new(TurnId::new(), Role::User, "x", "m", Usage::default());
        assert!(history.append(&record).is_err());
    }
}
