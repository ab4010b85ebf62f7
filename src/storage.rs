use crate::error::StorageError;
use directories::ProjectDirs;
use fs2::FileExt;
use std::collections::BTreeMap;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::warn;

// Keys shared with the web front-ends of the same backend
pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const THEME_KEY: &str = "theme";

/// Overrides the data directory (used by tests and portable installs).
pub const DATA_DIR_ENV: &str = "TASKBOARD_DATA_DIR";

const PREFERENCES_FILE: &str = "preferences.json";

/// Small persistent key/value store living in one JSON file.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$TASKBOARD_DATA_DIR` if set, otherwise the platform data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        if let Ok(dir) = env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            return Ok(Self::new(dir));
        }
        let proj = ProjectDirs::from("com", "taskboard", "taskboard").ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(proj.data_dir()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn preferences_path(&self) -> PathBuf {
        self.root.join(PREFERENCES_FILE)
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<(), StorageError> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Runs `f` while holding an exclusive lock on `<path>.lock`.
    pub fn with_lock<T, F>(path: &Path, f: F) -> Result<T, StorageError>
    where
        F: FnOnce() -> Result<T, StorageError>,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path.with_extension("lock"))?;
        FileExt::lock_exclusive(&lock_file)?;
        let result = f();
        FileExt::unlock(&lock_file)?;
        result
    }

    fn load_internal(path: &Path) -> BTreeMap<String, String> {
        if !path.exists() {
            return BTreeMap::new();
        }
        // A corrupt file is treated as empty rather than locking the user out.
        match fs::read_to_string(path).map(|json| serde_json::from_str(&json)) {
            Ok(Ok(map)) => map,
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable preferences");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read preferences");
                BTreeMap::new()
            }
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.preferences_path();
        if !path.exists() {
            return Ok(None);
        }
        Self::with_lock(&path, || Ok(Self::load_internal(&path).remove(key)))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|map| {
            map.remove(key);
        })
    }

    /// Locks -> Loads -> Applies Closure -> Saves -> Unlocks.
    fn modify<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let path = self.preferences_path();
        Self::with_lock(&path, || {
            let mut map = Self::load_internal(&path);
            f(&mut map);
            let json = serde_json::to_string_pretty(&map)?;
            Self::atomic_write(&path, json)
        })
    }
}
