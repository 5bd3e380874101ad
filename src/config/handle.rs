// src/config/handle.rs

//! Hot-reloadable access to the current configuration.
//!
//! Spawners never hold a config value; they hold a [`ConfigFetcher`] and call
//! it whenever they need a setting, so a [`ConfigHandle::reload`] is picked
//! up by the next `room()`/`name()`/export call.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::config::loader::load_and_validate;
use crate::config::model::{ArbitratorSpawnerConfig, JitSpawnerConfig, ValidationConfig};
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Returns the current value of one config section.
pub type ConfigFetcher<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

/// Fetcher that always returns `value`.
pub fn fixed_fetcher<T: Send + Sync + 'static>(value: T) -> ConfigFetcher<T> {
    let value = Arc::new(value);
    Arc::new(move || Arc::clone(&value))
}

#[derive(Debug)]
pub struct ConfigHandle {
    current: RwLock<Arc<ValidationConfig>>,
}

impl ConfigHandle {
    pub fn new(config: ValidationConfig) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(Arc::new(config)),
        })
    }

    pub fn get(&self) -> Arc<ValidationConfig> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new configuration after validating it.
    pub fn replace(&self, config: ValidationConfig) -> Result<()> {
        validate_config(&config)?;
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(config);
        Ok(())
    }

    /// Re-read and validate the TOML file at `path`. On error the current
    /// configuration is kept.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<()> {
        let config = load_and_validate(&path)?;
        self.replace(config)?;
        info!(path = ?path.as_ref(), "validation config reloaded");
        Ok(())
    }

    pub fn arbitrator_fetcher(self: &Arc<Self>) -> ConfigFetcher<ArbitratorSpawnerConfig> {
        let handle = Arc::clone(self);
        Arc::new(move || Arc::new(handle.get().arbitrator.clone()))
    }

    pub fn jit_fetcher(self: &Arc<Self>) -> ConfigFetcher<JitSpawnerConfig> {
        let handle = Arc::clone(self);
        Arc::new(move || Arc::new(handle.get().jit.clone()))
    }
}
