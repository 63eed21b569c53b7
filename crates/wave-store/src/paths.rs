use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DATA_DIR_ENV: &str = "WAVE_DATA_DIR";
pub const DB_FILE: &str = "wave.db";
pub const CONFIG_FILE: &str = "config.toml";

/// `~/.wave-memory`, or `./.wave-memory` when no home directory is known.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".wave-memory")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Data directory from `WAVE_DATA_DIR`, falling back to the default.
pub fn resolve_data_dir() -> PathBuf {
    env::var(DATA_DIR_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_base_dir)
}

/// Create `base` if needed and open the blob database inside it.
pub fn open_data_dir(base: &Path) -> Result<Store> {
    fs::create_dir_all(base).map_err(|e| {
        StoreError::InvalidData(format!("failed to create {}: {e}", base.display()))
    })?;
    Store::open(&base.join(DB_FILE))
}
