mod common;
use crate::common::{TestResult, hash, init_tracing};

use std::fs;
use std::path::Path;

use validation_spawner::errors::ValidationError;
use validation_spawner::machine::MachineLocator;

#[test]
fn machine_path_uses_hex_module_root() {
    let locator = MachineLocator::new("/machines", None);

    assert_eq!(
        locator.machine_path(hash(0xab)),
        Path::new("/machines").join(format!("0x{}", "ab".repeat(32)))
    );
    assert_eq!(locator.root_path(), Path::new("/machines"));
}

#[test]
fn missing_latest_is_not_an_error() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    let locator = MachineLocator::from_root_path(tmp.path())?;

    assert_eq!(locator.latest_wasm_module_root(), None);
    Ok(())
}

#[test]
fn latest_from_module_root_file() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    fs::create_dir(tmp.path().join("latest"))?;
    fs::write(
        tmp.path().join("latest").join("module-root.txt"),
        format!("0x{}\n", "cd".repeat(32)),
    )?;

    let locator = MachineLocator::from_root_path(tmp.path())?;

    assert_eq!(locator.latest_wasm_module_root(), Some(hash(0xcd)));
    Ok(())
}

#[cfg(unix)]
#[test]
fn latest_from_symlink_name() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let target = tmp.path().join(hash(0x5a).to_string());
    fs::create_dir(&target)?;
    std::os::unix::fs::symlink(&target, tmp.path().join("latest"))?;

    let locator = MachineLocator::from_root_path(tmp.path())?;

    assert_eq!(locator.latest_wasm_module_root(), Some(hash(0x5a)));
    Ok(())
}

#[test]
fn garbage_latest_is_a_config_error() -> TestResult {
    let tmp = tempfile::tempdir()?;
    fs::create_dir(tmp.path().join("latest"))?;
    fs::write(tmp.path().join("latest").join("module-root.txt"), "not hex")?;

    let err = MachineLocator::from_root_path(tmp.path()).unwrap_err();

    assert!(matches!(err, ValidationError::Config(_)));
    Ok(())
}
