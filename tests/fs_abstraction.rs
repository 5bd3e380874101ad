use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use validation_spawner::fs::{FileSystem, MockFileSystem, RealFileSystem};

#[test]
fn real_fs_writes_and_truncates() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("a/b");
    let fs_impl = RealFileSystem;

    fs_impl.create_dir_all(&dir).unwrap();
    fs_impl.write(&dir.join("data.bin"), b"long contents").unwrap();
    fs_impl.write(&dir.join("data.bin"), b"short").unwrap();

    assert_eq!(fs::read(dir.join("data.bin")).unwrap(), b"short".to_vec());
}

#[cfg(unix)]
#[test]
fn real_fs_sets_executable_bit() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let fs_impl = RealFileSystem;
    fs_impl.write(&tmp.path().join("plain"), b"x").unwrap();
    fs_impl.write_executable(&tmp.path().join("script"), b"#!/bin/sh\n").unwrap();

    let plain = fs::metadata(tmp.path().join("plain")).unwrap().permissions().mode();
    let script = fs::metadata(tmp.path().join("script")).unwrap().permissions().mode();
    assert_eq!(plain & 0o111, 0);
    assert_eq!(script & 0o100, 0o100);
}

#[test]
fn mock_fs_requires_parent_directory() {
    let fs_impl = MockFileSystem::new();

    let err = fs_impl.write(Path::new("/out/file.bin"), b"x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    fs_impl.create_dir_all(Path::new("/out")).unwrap();
    fs_impl.write(Path::new("/out/file.bin"), b"x").unwrap();
    assert!(fs_impl.has_dir("/"));
    assert_eq!(fs_impl.file("/out/file.bin").unwrap().contents, b"x".to_vec());
}

#[test]
fn mock_fs_failure_injection() {
    let fs_impl = MockFileSystem::new();
    fs_impl.create_dir_all(Path::new("/out")).unwrap();
    fs_impl.fail_on("/out/bad.bin");

    let err = fs_impl
        .write_executable(Path::new("/out/bad.bin"), b"x")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(fs_impl.file("/out/bad.bin").is_none());
    assert!(fs_impl.written_paths().is_empty());
}
