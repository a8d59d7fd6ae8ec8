#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

const GPU_LINE: &str =
    "0, GPU-1f2e3d4c, 45, 16384, 2048, 14336, 535.104.05, Tesla T4, 1321020022261, Disabled, Enabled, 41";

/// Fake nvidia-smi that records each call in `calls`
fn fake_nvidia_smi(dir: &Path) -> PathBuf {
    let path = dir.join("nvidia-smi");
    let calls = dir.join("calls");
    fs::write(
        &path,
        format!(
            "#!/bin/sh\necho x >> '{}'\necho '{}'\n",
            calls.display(),
            GPU_LINE
        ),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn glistener(dir: &Path, args: &[&str]) -> std::process::Output {
    let config = dir.join("config.toml");
    fs::write(&config, "").unwrap();

    Command::new(env!("CARGO_BIN_EXE_glistener"))
        .arg("--config")
        .arg(&config)
        .arg("--nvidia-smi")
        .arg(fake_nvidia_smi(dir))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = glistener(dir.path(), &["--d", "2", "--l", "1", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["device_count"], 1);
    assert_eq!(report["device_name"], "Tesla T4");
    assert_eq!(report["driver_version"], "535.104.05");
    assert_eq!(report["tick_count"], 2);
    assert_eq!(report["devices"][0]["avg_utilization"], 0.45);
    assert_eq!(report["devices"][0]["memory_total"], 16384.0);
}

#[test]
fn test_delay_not_below_duration_fails_before_sampling() {
    let dir = tempfile::tempdir().unwrap();
    let output = glistener(dir.path(), &["-d", "5", "-l", "5"]);

    assert!(!output.status.success());
    assert!(!dir.path().join("calls").exists());
}
