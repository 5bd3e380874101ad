// src/config/mod.rs

//! Configuration for the validation spawners.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Hand hot-reloadable views to the spawners (`handle.rs`).

pub mod handle;
pub mod loader;
pub mod model;
pub mod validate;

pub use handle::{ConfigFetcher, ConfigHandle, fixed_fetcher};
pub use loader::{load_and_validate, load_from_path};
pub use model::{ArbitratorSpawnerConfig, JitSpawnerConfig, ValidationConfig};
pub use validate::validate_config;
