use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

/// Load/save contract for one persisted document.
///
/// `load` never fails: a missing or unreadable document comes back as
/// `T::default()`. `save` replaces the whole document or leaves the previous
/// one in place.
pub trait StateStore<T>: Send + Sync {
    fn load(&self) -> T;
    fn save(&self, value: &T) -> Result<()>;
}

/// JSON document on disk, replaced atomically via a temp file and rename.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> StateStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> T {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => {
                info!("No state file at {:?}, starting fresh", self.path);
                return T::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️  Ignoring corrupt state file {:?}: {}", self.path, e);
                T::default()
            }
        }
    }

    fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create state directory")?;
            }
        }

        let contents = serde_json::to_string_pretty(value).context("Failed to serialize state")?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, contents).context("Failed to write temp state file")?;
        fs::rename(&temp_path, &self.path).context("Failed to replace state file")?;

        Ok(())
    }
}
