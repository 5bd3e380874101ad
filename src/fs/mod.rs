// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub mod mock;

pub use mock::MockFileSystem;

/// Abstract filesystem interface used by the artifact exporter.
///
/// Errors are plain `io::Error`s so callers can surface them unchanged.
pub trait FileSystem: Send + Sync + Debug {
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create or truncate `path` and write `contents` (mode 0644).
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Like [`write`](Self::write) but the file is made executable (mode 0755).
    fn write_executable(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = open_truncate(path, 0o644)?;
        file.write_all(contents)?;
        file.flush()
    }

    fn write_executable(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = open_truncate(path, 0o755)?;
        file.write_all(contents)?;
        file.flush()
    }
}

#[cfg(unix)]
fn open_truncate(path: &Path, mode: u32) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn open_truncate(path: &Path, _mode: u32) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
