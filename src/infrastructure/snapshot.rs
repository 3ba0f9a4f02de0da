//! JSON snapshots of the memory store

use crate::error::{Result, TagmapError};
use crate::infrastructure::config::STATE_DIR;
use crate::infrastructure::memory::{MemoryStore, Tables};
use crate::infrastructure::store::TagStore;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "store.json";

fn snapshot_path(path: &Path) -> PathBuf {
    path.join(STATE_DIR).join(SNAPSHOT_FILE)
}

impl MemoryStore {
    /// Load a store from .tagmap/store.json in the given directory
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let file = snapshot_path(path);
        let contents = fs::read_to_string(&file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TagmapError::NotFound(format!("No store snapshot at {}", file.display()))
            } else {
                TagmapError::Io(e)
            }
        })?;

        let tables: Tables = serde_json::from_str(&contents)?;
        let store = MemoryStore::from_tables(tables);
        store.load_tree()?;
        debug!("Loaded store snapshot from {}", file.display());
        Ok(store)
    }

    /// Write the committed tables to .tagmap/store.json.
    ///
    /// Writes to a temp file in the same directory, then renames into place.
    pub fn save_to_dir(&self, path: &Path) -> Result<()> {
        if self.in_transaction() {
            return Err(TagmapError::Persistence(
                "Cannot snapshot a store with an open transaction".to_string(),
            ));
        }

        let file = snapshot_path(path);
        if let Some(parent) = file.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(&self.tables)?;
        let tmp_path = file.with_file_name(format!(
            "{}.tagmap-tmp-{}",
            SNAPSHOT_FILE,
            std::process::id()
        ));
        fs::write(&tmp_path, contents)?;

        if file.exists() {
            // rename does not overwrite on Windows
            fs::remove_file(&file)?;
        }
        fs::rename(&tmp_path, &file)?;
        debug!("Saved store snapshot to {}", file.display());
        Ok(())
    }
}
