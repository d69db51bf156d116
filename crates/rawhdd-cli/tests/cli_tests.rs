//! Integration tests for the rawhdd CLI
//!
//! These tests verify the CLI behavior without requiring root privileges
//! or actual hardware: drives are stood in for by temporary image files
//! passed with `--device`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the rawhdd binary, isolated from the user's config
#[allow(deprecated)]
fn rawhdd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rawhdd").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("APPDATA", home.join("AppData"))
        .current_dir(home);
    cmd
}

/// Write a fake drive of the given geometry filled with `byte`
fn fake_drive(dir: &Path, cylinders: u32, heads: u32, sectors: u32, byte: u8) -> String {
    let path = dir.join("drive.bin");
    let size = (cylinders * heads * sectors) as usize * 512;
    fs::write(&path, vec![byte; size]).unwrap();
    path.to_string_lossy().into_owned()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("hard disk imaging"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("image"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rawhdd"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_image_help() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .args(["image", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<DESTINATION>"))
        .stdout(predicate::str::contains("--drive"))
        .stdout(predicate::str::contains("--cylinders"))
        .stdout(predicate::str::contains("--heads"))
        .stdout(predicate::str::contains("--sectors"))
        .stdout(predicate::str::contains("--device"));
}

#[test]
fn test_probe_help() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .args(["probe", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"));
}

// ============================================================================
// Image Command Tests
// ============================================================================

#[test]
fn test_image_missing_destination() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .arg("image")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<DESTINATION>"));
}

#[test]
fn test_image_with_full_geometry() {
    let home = TempDir::new().unwrap();
    let device = fake_drive(home.path(), 4, 2, 17, 0xA5);
    let output = home.path().join("disk.img");

    rawhdd(home.path())
        .args(["image", "-y", "-c", "4", "-H", "2", "-s", "17", "--device", &device])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Using command line drive geometry"))
        .stdout(predicate::str::contains("CHS: 4,2,17"));

    let image = fs::read(&output).unwrap();
    assert_eq!(image.len(), 4 * 2 * 17 * 512);
    assert!(image.iter().all(|&b| b == 0xA5));

    // Default log lands in the working directory
    let log = fs::read_to_string(home.path().join("rawhdd.log")).unwrap();
    assert!(log.contains("copy started at"));
    assert!(log.contains("Drive 0 CHS: 4,2,17"));
    assert!(log.contains("OK: 0,0,*"));
    assert!(log.contains("OK: 3,1,*"));
    assert!(log.contains("copy finished at"));
}

#[test]
fn test_image_log_appends_across_runs() {
    let home = TempDir::new().unwrap();
    let device = fake_drive(home.path(), 1, 1, 1, 0);
    let log = home.path().join("custom.log");

    for name in ["a.img", "b.img"] {
        rawhdd(home.path())
            .args(["-q", "image", "-y", "-c", "1", "-H", "1", "-s", "1"])
            .args(["--device", &device, "--log"])
            .arg(&log)
            .arg(home.path().join(name))
            .assert()
            .success();
    }

    let contents = fs::read_to_string(&log).unwrap();
    assert_eq!(contents.matches("copy started at").count(), 2);
    assert_eq!(contents.matches("copy finished at").count(), 2);
}

#[test]
fn test_image_short_device_records_errors() {
    let home = TempDir::new().unwrap();
    // Geometry claims two cylinders but the device only holds one
    let device = fake_drive(home.path(), 1, 1, 2, 0x11);
    let output = home.path().join("disk.img");

    rawhdd(home.path())
        .args(["image", "-y", "-c", "2", "-H", "1", "-s", "2", "--retries", "1"])
        .args(["--device", &device])
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("2 unreadable sectors"));

    assert_eq!(fs::metadata(&output).unwrap().len(), 4 * 512);
    let log = fs::read_to_string(home.path().join("rawhdd.log")).unwrap();
    assert!(log.contains("OK: 0,0,*"));
    assert!(log.contains("ERR: 1,0,1"));
    assert!(log.contains("ERR: 1,0,2"));
}

#[test]
fn test_image_zero_geometry_fails() {
    let home = TempDir::new().unwrap();
    let device = fake_drive(home.path(), 1, 1, 1, 0);
    let output = home.path().join("disk.img");

    rawhdd(home.path())
        .args(["image", "-y", "-c", "10", "-H", "0", "-s", "17", "--device", &device])
        .arg(&output)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("geometry"));

    assert!(!output.exists());
}

#[test]
fn test_image_partial_geometry_needs_detection() {
    let home = TempDir::new().unwrap();
    // A regular file reports no geometry of its own
    let device = fake_drive(home.path(), 1, 1, 1, 0);
    let output = home.path().join("disk.img");

    rawhdd(home.path())
        .args(["image", "-y", "-s", "63", "--device", &device])
        .arg(&output)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to determine drive geometry"));

    assert!(!output.exists());
}

#[test]
fn test_image_missing_device() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("disk.img");

    rawhdd(home.path())
        .args(["image", "-y", "-c", "1", "-H", "1", "-s", "1"])
        .args(["--device", "/nonexistent/rawhdd/drive"])
        .arg(&output)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to open device"));
}

#[test]
fn test_image_invalid_drive_number() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .args(["image", "-d", "999", "disk.img"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("999"));
}

#[test]
fn test_drive_number_without_bios_code_rejected() {
    let home = TempDir::new().unwrap();
    for sub in ["image", "probe"] {
        let mut cmd = rawhdd(home.path());
        cmd.args([sub, "-d", "200"]);
        if sub == "image" {
            cmd.arg("disk.img");
        }
        cmd.assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("200"));
    }
    assert!(!home.path().join("disk.img").exists());
}

#[test]
fn test_highest_drive_number_accepted() {
    let home = TempDir::new().unwrap();
    let device = fake_drive(home.path(), 1, 1, 1, 0);
    rawhdd(home.path())
        .args(["-q", "image", "-y", "-d", "127", "-c", "1", "-H", "1", "-s", "1"])
        .args(["--device", &device, "disk.img"])
        .assert()
        .success();

    let log = fs::read_to_string(home.path().join("rawhdd.log")).unwrap();
    assert!(log.contains("Drive 127 CHS: 1,1,1"));
}

// ============================================================================
// Probe Command Tests
// ============================================================================

#[test]
fn test_probe_regular_file_fails() {
    let home = TempDir::new().unwrap();
    let device = fake_drive(home.path(), 1, 1, 1, 0);

    rawhdd(home.path())
        .args(["probe", "--device", &device])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to probe"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_path() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rawhdd_config.toml"));
}

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[imaging]"))
        .stdout(predicate::str::contains("retry_attempts = 10"))
        .stdout(predicate::str::contains("not found, using defaults"));
}

#[test]
fn test_config_json() {
    let home = TempDir::new().unwrap();
    let output = rawhdd(home.path())
        .args(["config", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["imaging"]["retry_attempts"], 10);
    assert_eq!(json["behavior"]["skip_confirmation"], false);
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    rawhdd(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("not found").not());
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rawhdd"));
}

#[test]
fn test_completions_invalid_shell() {
    let home = TempDir::new().unwrap();
    rawhdd(home.path())
        .args(["completions", "notashell"])
        .assert()
        .failure();
}

#[test]
fn test_mangen_writes_pages() {
    let home = TempDir::new().unwrap();
    let out_dir = home.path().join("man");

    rawhdd(home.path())
        .args(["mangen", "--out-dir"])
        .arg(&out_dir)
        .assert()
        .success();

    assert!(out_dir.join("rawhdd.1").exists());
    assert!(out_dir.join("rawhdd-image.1").exists());
}
