//! TOML configuration loading.

use std::fs;
use std::io;
use std::path::Path;

use wave_core::EngineConfig;

use crate::error::{Result, StoreError};

/// Read an engine config from `path`. A missing file yields the defaults;
/// anything that is present must parse and validate.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let config = match fs::read_to_string(path) {
        Ok(text) => parse_config(&text)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            EngineConfig::default()
        }
        Err(e) => return Err(StoreError::Io(e)),
    };
    config
        .validate()
        .map_err(|e| StoreError::Config(e.to_string()))?;
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<EngineConfig> {
    toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
}

pub fn to_toml(config: &EngineConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| StoreError::Config(e.to_string()))
}
