//! Durable storage for the last applied storage configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use gallery_models::StorageConfig;
use thiserror::Error;
use tracing::debug;

/// Fixed name of the persisted configuration entry.
pub const STORED_CONFIG_KEY: &str = "aws_s3_config";

/// Errors reading or writing the persisted configuration.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Config store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Stored configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Key-value slot holding one serialized [`StorageConfig`].
pub trait ConfigStore: Send + Sync {
    /// Read the stored configuration. A missing entry is `Ok(None)`.
    fn load(&self) -> PersistResult<Option<StorageConfig>>;

    fn save(&self, config: &StorageConfig) -> PersistResult<()>;

    /// Remove the entry. Removing a missing entry succeeds.
    fn remove(&self) -> PersistResult<()>;

    /// Whether an entry exists right now, readable or not.
    fn contains(&self) -> bool;
}

/// JSON file `<dir>/aws_s3_config.json`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", STORED_CONFIG_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> PersistResult<Option<StorageConfig>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, config: &StorageConfig) -> PersistResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_vec_pretty(config)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        restrict_permissions(&temp)?;
        fs::rename(&temp, &self.path)?;

        debug!(path = %self.path.display(), "Saved storage configuration");
        Ok(())
    }

    fn remove(&self) -> PersistResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self) -> bool {
        self.path.is_file()
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// In-memory slot holding the serialized JSON, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    slot: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with raw text, which need not be valid JSON.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> PersistResult<Option<StorageConfig>> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, config: &StorageConfig) -> PersistResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "quota exceeded").into());
        }
        let json = serde_json::to_string(config)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }

    fn remove(&self) -> PersistResult<()> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn contains(&self) -> bool {
        self.raw().is_some()
    }
}
