//! Persistent session tree storage.
//!
//! The tree lives in one pretty-printed JSON file. Writes go to a temporary
//! file in the same directory which is then renamed over the state file, so
//! readers never see a partial tree. Mutations go through [`TreeStore::update`],
//! which holds an exclusive lock on `<state file>.lock` across the
//! reload-mutate-save cycle so that concurrent invocations do not lose each
//! other's updates.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use stree_core::SessionTree;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::StoreError;

/// Loads and saves the session tree at a fixed path.
#[derive(Debug, Clone)]
pub struct TreeStore {
    path: PathBuf,
    root: String,
}

impl TreeStore {
    /// Creates a store for `path`; `root` names the root of a fresh tree.
    pub fn new(path: impl Into<PathBuf>, root: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Creates the store described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.state_file_path(), config.tmux.root_session.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the tree.
    ///
    /// A missing or unreadable state file yields a fresh empty tree; the
    /// failure is logged, never returned.
    pub fn load(&self) -> SessionTree {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No session tree yet, starting empty");
                return SessionTree::new(self.root.clone());
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session tree, initializing new tree");
                return SessionTree::new(self.root.clone());
            }
        };

        match serde_json::from_str(&data) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse session tree, initializing new tree");
                SessionTree::new(self.root.clone())
            }
        }
    }

    /// Saves the whole tree atomically, creating parent directories.
    pub fn save(&self, tree: &SessionTree) -> Result<(), StoreError> {
        let dir = self.state_dir();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(tree)?;

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(path = %self.path.display(), nodes = tree.len(), "Saved session tree");
        Ok(())
    }

    /// Reloads the tree under the state lock, applies `mutate`, and saves.
    ///
    /// Nothing is written when `mutate` fails.
    pub fn update<T, E>(&self, mutate: impl FnOnce(&mut SessionTree) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let lock = self.lock()?;

        let mut tree = self.load();
        let result = mutate(&mut tree);
        if result.is_ok() {
            self.save(&tree)?;
        }

        if let Err(e) = FileExt::unlock(&lock) {
            debug!(error = %e, "Failed to release state lock explicitly");
        }
        result
    }

    fn state_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn lock(&self) -> Result<File, StoreError> {
        let dir = self.state_dir();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = self.lock_path();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StoreError::Lock {
                path: path.clone(),
                source,
            })?;
        file.lock_exclusive()
            .map_err(|source| StoreError::Lock { path, source })?;
        Ok(file)
    }
}
