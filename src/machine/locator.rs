// src/machine/locator.rs

//! Where machine binaries live on disk.
//!
//! Layout under the root path:
//!
//! ```text
//! <root>/0x<module root>/replay.wasm, ...
//! <root>/latest -> 0x<module root>      (symlink, or a directory holding
//!                                        module-root.txt)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{Result, ValidationError};
use crate::types::ModuleRoot;

const LATEST_DIR: &str = "latest";
const MODULE_ROOT_FILE: &str = "module-root.txt";

#[derive(Debug, Clone)]
pub struct MachineLocator {
    root_path: PathBuf,
    latest: Option<ModuleRoot>,
}

impl MachineLocator {
    pub fn new(root_path: impl Into<PathBuf>, latest: Option<ModuleRoot>) -> Self {
        Self {
            root_path: root_path.into(),
            latest,
        }
    }

    /// Build a locator and discover the latest module root from `<root>/latest`.
    ///
    /// A missing `latest` entry is not an error; a present but unreadable one
    /// is.
    pub fn from_root_path(root_path: impl Into<PathBuf>) -> Result<Self> {
        let root_path = root_path.into();
        let latest = discover_latest(&root_path)?;
        debug!(root = ?root_path, ?latest, "machine locator initialised");
        Ok(Self { root_path, latest })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn machine_path(&self, module_root: ModuleRoot) -> PathBuf {
        self.root_path.join(module_root.to_string())
    }

    pub fn latest_wasm_module_root(&self) -> Option<ModuleRoot> {
        self.latest
    }
}

fn discover_latest(root_path: &Path) -> Result<Option<ModuleRoot>> {
    let latest = root_path.join(LATEST_DIR);
    let meta = match fs::symlink_metadata(&latest) {
        Ok(meta) => meta,
        Err(_) => {
            warn!(path = ?latest, "no latest machine link found");
            return Ok(None);
        }
    };

    let raw = if meta.file_type().is_symlink() {
        let target = fs::read_link(&latest)?;
        target
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ValidationError::Config(format!("latest link {:?} has no file name", target))
            })?
    } else {
        fs::read_to_string(latest.join(MODULE_ROOT_FILE))?
    };

    raw.trim().parse::<ModuleRoot>().map(Some).map_err(|e| {
        ValidationError::Config(format!("invalid latest module root {:?}: {e}", raw.trim()))
    })
}
