#![cfg(feature = "cli")]

use std::process::Command;

fn hidlink() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hidlink"))
}

#[test]
fn version_prints_package_version() {
    let output = hidlink()
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("hidlink {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_extended_reports_backend() {
    let output = hidlink()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: hidlink"));
    assert!(stdout.contains("backend: "));
}

#[test]
fn send_with_bad_hex_returns_usage() {
    let output = hidlink()
        .args(["send", "00:1F:32:AA:BB:CC", "--data", "zz"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not valid hex"));
}

#[test]
fn send_with_oversized_frame_returns_data_invalid() {
    let data = "52".repeat(26);
    let output = hidlink()
        .args(["send", "00:1F:32:AA:BB:CC", "--data", &data])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn send_with_bad_address_returns_usage() {
    let output = hidlink()
        .args(["send", "not-an-address", "--data", "521110"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn listen_with_bad_address_returns_usage() {
    let output = hidlink()
        .args(["listen", "00:1F:32:AA:BB"])
        .output()
        .expect("listen should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn bad_config_file_returns_data_invalid() {
    let path = std::env::temp_dir().join(format!("hidlink-bad-config-{}.json", std::process::id()));
    std::fs::write(&path, "{ not json").expect("temp config should be writable");

    let output = hidlink()
        .args(["scan", "--config"])
        .arg(&path)
        .output()
        .expect("scan should run");
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn doctor_emits_json_report() {
    let output = hidlink()
        .args(["doctor", "--format", "json"])
        .output()
        .expect("doctor should run");
    let code = output.status.code();
    assert!(code == Some(0) || code == Some(30), "unexpected exit {code:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"overall\""));
    assert!(stdout.contains("platform_transport"));
}
