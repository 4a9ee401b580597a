//! CLI end-to-end tests
//!
//! Tests for the nalscope command-line interface.

use assert_cmd::prelude::*;
use nalscope_bitstream::testing::simple_stream;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the nalscope binary
#[allow(deprecated)]
fn nalscope_cmd() -> Command {
    let mut cmd = Command::cargo_bin("nalscope").unwrap();
    // Keep config discovery away from the developer's files
    cmd.env("HOME", "/nonexistent");
    cmd
}

/// Write a small stream (IDR, two trailing pictures) into a temp dir
fn write_stream(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, simple_stream(&[(19, 0), (1, 4), (1, 2)])).unwrap();
    path
}

fn run_in(dir: &Path, cmd: &mut Command) {
    cmd.current_dir(dir);
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = nalscope_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = nalscope_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("nalscope"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = nalscope_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "nalscope {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_scan_help() {
    let mut cmd = nalscope_cmd();
    cmd.args(["scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-units"))
        .stdout(predicate::str::contains("--tree"));
}

#[test]
fn test_cli_scan_text() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "clip.hevc");

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    cmd.arg("scan")
        .arg(&stream)
        .assert()
        .success()
        .stdout(predicate::str::contains("Format: Annex-B HEVC"))
        .stdout(predicate::str::contains("NAL Units: 6 (3 pictures, 0 truncated)"))
        .stdout(predicate::str::contains("IDR_W_RADL"))
        .stdout(predicate::str::contains("POC Sequence: 0 4 2"));
}

#[test]
fn test_cli_scan_json() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "clip.h265");

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    let output = cmd.args(["scan", "--json"]).arg(&stream).output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["poc"], serde_json::json!([0, 4, 2]));
    assert_eq!(value["summary"]["pictures"], 3);
    assert_eq!(value["sequences"][0]["width"], 64);
}

#[test]
fn test_cli_scan_tree() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "clip.hevc");

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    cmd.args(["scan", "--tree"])
        .arg(&stream)
        .assert()
        .success()
        .stdout(predicate::str::contains("NAL unit at 1"))
        .stdout(predicate::str::contains("seq_parameter_set_rbsp"))
        .stdout(predicate::str::contains("slice_pic_order_cnt_lsb"));
}

#[test]
fn test_cli_scan_max_units() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "clip.hevc");

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    cmd.args(["scan", "--max-units", "4"])
        .arg(&stream)
        .assert()
        .success()
        .stdout(predicate::str::contains("NAL Units: 4 (1 pictures"))
        .stdout(predicate::str::contains("POC Sequence: 0\n"));
}

#[test]
fn test_cli_scan_nonexistent_file() {
    let mut cmd = nalscope_cmd();
    cmd.args(["scan", "/nonexistent/path/clip.hevc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_scan_rejects_container() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "movie.mkv");

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    cmd.arg("scan")
        .arg(&stream)
        .assert()
        .failure()
        .stderr(predicate::str::contains("demuxed"));
}

#[test]
fn test_cli_scan_rejects_avc() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "clip.264");

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    cmd.arg("scan")
        .arg(&stream)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Annex-B AVC"));
}

#[test]
fn test_cli_scan_uses_config_output_format() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "clip.hevc");
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[output]\nformat = \"json\"\n").unwrap();

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    cmd.arg("--config")
        .arg(&config)
        .arg("scan")
        .arg(&stream)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_cli_info() {
    let dir = tempdir().unwrap();
    let stream = write_stream(&dir, "clip.hevc");

    let mut cmd = nalscope_cmd();
    cmd.arg("info")
        .arg(&stream)
        .assert()
        .success()
        .stdout(predicate::str::contains("File Path"))
        .stdout(predicate::str::contains("Time Modified"))
        .stdout(predicate::str::contains("Nr Bytes"))
        .stdout(predicate::str::contains("Format: Annex-B HEVC"));
}

#[test]
fn test_cli_validate_default() {
    let dir = tempdir().unwrap();

    let mut cmd = nalscope_cmd();
    run_in(dir.path(), &mut cmd);
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Buffer size: 40960"));
}

#[test]
fn test_cli_validate_valid_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("nalscope.toml");
    fs::write(&config, "[scanner]\nmax_units = 10\n").unwrap();

    let mut cmd = nalscope_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Max units: 10"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[scanner]\nbuffer_size = 1\n").unwrap();

    let mut cmd = nalscope_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("buffer_size"));
}
