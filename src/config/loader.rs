// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::ValidationConfig;
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ValidationConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: ValidationConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application.
/// Missing sections and keys fall back to their defaults.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ValidationConfig> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("validation.toml")
}
