use crate::{CoreError, HistoryStore};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON file holding the sent-post history, one list per subreddit.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored history. A missing file is an empty history.
    pub fn load(&self, max_size: usize) -> Result<HistoryStore, CoreError> {
        info!("Loading history from {}", self.path.display());
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Could not find {}, starting empty", self.path.display());
                return Ok(HistoryStore::new(max_size));
            }
            Err(e) => return Err(CoreError::Io(e)),
        };

        let snapshot: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)?;
        Ok(HistoryStore::from_snapshot(snapshot, max_size))
    }

    /// Replaces the file contents with `history`.
    ///
    /// The data goes to a sibling `.tmp` file first and is then renamed over
    /// the target, so readers never observe a partial write.
    pub fn save(&self, history: &HistoryStore) -> Result<(), CoreError> {
        debug!("Storing history in {}", self.path.display());
        let json = serde_json::to_string_pretty(&history.snapshot())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
