//! # File Store
//!
//! Keeps each key in its own file inside one directory.
//!
//! ## Write Path
//! ```text
//! set("pos_carrito", json)
//!      │
//!      ▼
//! write  <dir>/.pos_carrito.json.tmp
//!      │
//!      ▼
//! rename → <dir>/pos_carrito.json     (readers never see a half-written file)
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::{validate_key, KeyValueStore};

const EXTENSION: &str = "json";

/// A store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).map_err(|source| StoreError::Unavailable {
            path: root.display().to_string(),
            source,
        })?;

        debug!(path = %root.display(), "Opened file store");
        Ok(FileStore { root })
    }

    /// Directory holding the files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.{}", key, EXTENSION)))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!(".{}.{}.tmp", key, EXTENSION))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;

        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let temp = self.temp_path_for(key);
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            source,
        };

        fs::write(&temp, value).map_err(write_err)?;
        if let Err(source) = fs::rename(&temp, &path) {
            // Best effort; the temp file is harmless if this fails too
            let _ = fs::remove_file(&temp);
            return Err(write_err(source));
        }

        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Removed value");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }
}
