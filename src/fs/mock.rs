// src/fs/mock.rs

use super::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFile {
    pub contents: Vec<u8>,
    pub executable: bool,
}

/// In-memory filesystem with failure injection.
///
/// Writes are recorded in order; a path registered with
/// [`fail_on`](MockFileSystem::fail_on) makes the write to it fail with
/// `io::ErrorKind::PermissionDenied`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockFile>>>,
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
    writes: Arc<Mutex<Vec<PathBuf>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, path: impl AsRef<Path>) {
        self.failing
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<MockFile> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().unwrap().contains(path.as_ref())
    }

    /// Paths written so far, in write order.
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, path: &Path, contents: &[u8], executable: bool) -> io::Result<()> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("mock write failure for {:?}", path),
            ));
        }
        let parent_known = path
            .parent()
            .map(|p| p.as_os_str().is_empty() || self.has_dir(p))
            .unwrap_or(true);
        if !parent_known {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("parent directory of {:?} does not exist", path),
            ));
        }

        self.files.lock().unwrap().insert(
            path.to_path_buf(),
            MockFile {
                contents: contents.to_vec(),
                executable,
            },
        );
        self.writes.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

impl FileSystem for MockFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("mock mkdir failure for {:?}", path),
            ));
        }
        let mut dirs = self.dirs.lock().unwrap();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.record(path, contents, false)
    }

    fn write_executable(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.record(path, contents, true)
    }
}
