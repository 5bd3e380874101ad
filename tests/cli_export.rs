mod common;
use crate::common::{TestResult, ValidationInputBuilder, hash, init_tracing};

use std::ffi::{OsStr, OsString};
use std::fs;

use clap::Parser;

use validation_spawner::cli::{CliArgs, Command};
use validation_spawner::export::SCRIPT_FILE;
use validation_spawner::run;
use validation_spawner::types::{BatchInfo, ValidationInput};

fn os(s: impl AsRef<OsStr>) -> OsString {
    s.as_ref().to_os_string()
}

#[test]
fn export_arguments_are_parsed() -> TestResult {
    let args = CliArgs::try_parse_from([
        "validation-spawner",
        "--root-path",
        "/machines",
        "export",
        "--input",
        "block.json",
        "--module-root",
        &hash(0x0c).to_string(),
        "--expected-batch",
        "5",
    ])?;

    assert_eq!(args.root_path, std::path::PathBuf::from("/machines"));
    match args.command {
        Command::Export {
            module_root,
            expected_batch,
            expected_pos,
            expected_hash,
            ..
        } => {
            assert_eq!(module_root, Some(hash(0x0c)));
            assert_eq!(expected_batch, 5);
            assert_eq!(expected_pos, 0);
            assert_eq!(expected_hash, hash(0));
        }
        other => panic!("unexpected command: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn export_command_writes_bundle_for_latest_root() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    fs::create_dir(tmp.path().join("latest"))?;
    fs::write(
        tmp.path().join("latest").join("module-root.txt"),
        hash(0x0d).to_string(),
    )?;
    fs::write(
        tmp.path().join("validation.toml"),
        "[arbitrator]\noutput-path = \"exports\"\n",
    )?;
    let input = ValidationInputBuilder::new(12)
        .start_state(hash(1), 3, 4)
        .batch(3, b"payload")
        .build();
    let input_path = tmp.path().join("block.json");
    fs::write(&input_path, serde_json::to_string(&input)?)?;

    let args = CliArgs::try_parse_from([
        os("validation-spawner"),
        os("--config"),
        os(tmp.path().join("validation.toml")),
        os("--root-path"),
        os(tmp.path()),
        os("export"),
        os("--input"),
        os(&input_path),
    ])?;
    run(args).await?;

    let stamps: Vec<_> = fs::read_dir(tmp.path().join("exports"))?.collect::<Result<_, _>>()?;
    assert_eq!(stamps.len(), 1);
    let bundle = stamps[0].path().join("block_12");
    assert_eq!(fs::read(bundle.join("sequencer_3.bin"))?, b"payload".to_vec());

    let script = fs::read_to_string(bundle.join(SCRIPT_FILE))?;
    let machine_dir = tmp.path().join(hash(0x0d).to_string());
    assert!(script.contains(&format!("MACHPATH=\"{}\"\n", machine_dir.display())));
    assert!(script.contains(" --inbox-position 3 --position-within-message 4 "));
    Ok(())
}

#[tokio::test]
async fn export_without_any_module_root_fails() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let input_path = tmp.path().join("block.json");
    fs::write(
        &input_path,
        serde_json::to_string(&ValidationInputBuilder::new(1).build())?,
    )?;

    let args = CliArgs::try_parse_from([
        os("validation-spawner"),
        os("--config"),
        os(tmp.path().join("missing.toml")),
        os("--root-path"),
        os(tmp.path()),
        os("export"),
        os("--input"),
        os(&input_path),
    ])?;

    let err = run(args).await.unwrap_err();
    assert!(err.to_string().contains("module root"));
    Ok(())
}

#[test]
fn input_payloads_accept_optional_hex_prefix() -> TestResult {
    let json = format!(
        r#"{{
            "id": 3,
            "start_state": {{"block_hash": "{h}", "batch": 5, "pos_in_batch": 0}},
            "batch_info": [{{"number": 5, "data": "0xabcd"}}, {{"number": 6, "data": "ef"}}],
            "has_delayed_msg": true,
            "delayed_msg_nr": 2,
            "delayed_msg": "0x0102",
            "preimages": {{"{h}": "0x99"}}
        }}"#,
        h = hash(0x11),
    );

    let input: ValidationInput = serde_json::from_str(&json)?;

    assert_eq!(input.batch_info[0].data, vec![0xab, 0xcd]);
    assert_eq!(input.batch_info[1].data, vec![0xef]);
    assert_eq!(input.delayed_msg, vec![1, 2]);
    assert_eq!(input.preimages[&hash(0x11)], vec![0x99]);

    let round_trip: ValidationInput =
        serde_json::from_str(&serde_json::to_string(&input)?)?;
    assert_eq!(round_trip, input);
    Ok(())
}

#[test]
fn doubled_hex_prefix_is_rejected() {
    for json in [
        r#"{"number": 5, "data": "0x0xabcd"}"#,
        r#"{"number": 5, "data": "0xabc"}"#,
    ] {
        assert!(serde_json::from_str::<BatchInfo>(json).is_err());
    }
}
