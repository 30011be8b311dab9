// ── On-disk registration state ──
//
// One flat TOML table per profile. Writes go to a temp file in the same
// directory and are renamed into place, so a crash mid-save leaves the
// previous snapshot intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use pushlink_core::{ConfigMap, ConfigStore, CoreError};

use crate::state_path;

/// [`ConfigStore`] backed by a TOML file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform data dir for `profile_name`.
    pub fn for_profile(profile_name: &str) -> Self {
        Self::new(state_path(profile_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn store_err(action: &str, path: &Path, err: impl std::fmt::Display) -> CoreError {
    CoreError::Store {
        message: format!("{action} {}: {err}", path.display()),
    }
}

impl ConfigStore for FileStore {
    fn load_all(&self) -> Result<ConfigMap, CoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigMap::new()),
            Err(e) => return Err(store_err("failed to read", &self.path, e)),
        };
        toml::from_str(&raw).map_err(|e| store_err("failed to parse", &self.path, e))
    }

    fn save_all(&self, map: &ConfigMap) -> Result<(), CoreError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| store_err("failed to create", parent, e))?;

        let body =
            toml::to_string(map).map_err(|e| store_err("failed to encode", &self.path, e))?;

        let mut tmp =
            NamedTempFile::new_in(parent).map_err(|e| store_err("failed to stage", parent, e))?;
        tmp.write_all(body.as_bytes())
            .map_err(|e| store_err("failed to write", tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| store_err("failed to replace", &self.path, e.error))?;

        debug!(path = %self.path.display(), keys = map.len(), "state saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_err("failed to remove", &self.path, e)),
        }
    }
}
