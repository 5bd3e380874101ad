// src/config/validate.rs

use crate::config::model::ValidationConfig;
use crate::errors::{Result, ValidationError};

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - `[arbitrator].target-machine-count >= 1`
/// - `[arbitrator].output-path` is not empty
pub fn validate_config(cfg: &ValidationConfig) -> Result<()> {
    validate_arbitrator(cfg)?;
    Ok(())
}

fn validate_arbitrator(cfg: &ValidationConfig) -> Result<()> {
    if cfg.arbitrator.target_machine_count == 0 {
        return Err(ValidationError::Config(
            "[arbitrator].target-machine-count must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.arbitrator.output_path.as_os_str().is_empty() {
        return Err(ValidationError::Config(
            "[arbitrator].output-path must not be empty".to_string(),
        ));
    }

    Ok(())
}
