use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0\x1f\x15\xc4\x89";

/// The binary with an isolated home, working directory and search path.
fn stego_sift(sandbox: &TempDir) -> Command {
    let empty_path = sandbox.path().join("empty-path");
    fs::create_dir_all(&empty_path).unwrap();
    let mut cmd = Command::cargo_bin("stego-sift").unwrap();
    cmd.current_dir(sandbox.path())
        .env("HOME", sandbox.path())
        .env("PATH", &empty_path)
        .env_remove("RUST_LOG")
        .env_remove("STEGO_SIFT_PASSPHRASE");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let sandbox = TempDir::new().unwrap();
    stego_sift(&sandbox)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("cleanup"));
}

#[test]
fn derivation_count_out_of_range_is_rejected() {
    let sandbox = TempDir::new().unwrap();
    let image = sandbox.path().join("cat.png");
    fs::write(&image, PNG).unwrap();

    stego_sift(&sandbox)
        .args(["analyze", "cat.png", "--tools", "outguess", "--derivation-count", "200", "--no-cleanup"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("derivation count must be between 1 and 100, got 200"));

    assert!(!sandbox.path().join("uploads").exists());
}

#[test]
fn unknown_tools_are_rejected() {
    let sandbox = TempDir::new().unwrap();
    stego_sift(&sandbox)
        .args(["tools", "guide", "--tools", "zsteg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown tool 'zsteg'"));
}

#[test]
fn non_images_are_refused_at_intake() {
    let sandbox = TempDir::new().unwrap();
    fs::write(sandbox.path().join("notes.png"), b"plain text pretending").unwrap();

    stego_sift(&sandbox)
        .args(["analyze", "notes.png", "--no-cleanup"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid image"));
}

#[test]
fn analyze_reports_missing_tools_as_json() {
    let sandbox = TempDir::new().unwrap();
    fs::write(sandbox.path().join("cat.png"), PNG).unwrap();

    let output = stego_sift(&sandbox)
        .args([
            "analyze",
            "cat.png",
            "--tools",
            "binwalk",
            "--format",
            "json",
            "--output-root",
            "runs",
            "--no-cleanup",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["missing_tools"], serde_json::json!(["binwalk"]));
    assert_eq!(report["results"][0]["module"], "binwalk");
    assert_eq!(report["results"][0]["status"], "not_found");
    assert_eq!(report["total_modules"], 0);
    assert_eq!(report["install_plan"]["package_manager"], "unknown");
    assert_eq!(report["install_plan"]["entries"]["binwalk"]["kind"], "manual");

    let checksum = report["upload"]["checksum"].as_str().unwrap();
    assert!(sandbox.path().join("runs").join(checksum).is_dir());
}

#[test]
fn guide_without_package_manager_gives_manual_steps() {
    let sandbox = TempDir::new().unwrap();
    stego_sift(&sandbox)
        .args(["tools", "guide", "--tools", "exiftool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Package manager: unknown"))
        .stdout(predicate::str::contains("https://exiftool.org/install.html"));
}

#[test]
fn install_without_package_manager_fails_cleanly() {
    let sandbox = TempDir::new().unwrap();
    stego_sift(&sandbox)
        .args(["tools", "install", "--tools", "steghide", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not detect package manager"));
}

#[test]
fn cleanup_removes_directory_and_tolerates_repeats() {
    let sandbox = TempDir::new().unwrap();
    let run_dir = sandbox.path().join("uploads").join("0123456789abcdef0123456789abcdef");
    fs::create_dir_all(run_dir.join("foremost")).unwrap();

    for _ in 0..2 {
        stego_sift(&sandbox)
            .arg("cleanup")
            .arg(&run_dir)
            .assert()
            .success();
        assert!(!run_dir.exists());
    }
}

#[test]
fn broken_config_is_an_error() {
    let sandbox = TempDir::new().unwrap();
    fs::write(sandbox.path().join(".stego-sift.toml"), "[paths\nbin_dir = ").unwrap();
    stego_sift(&sandbox)
        .args(["tools", "guide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse configuration file"));
}
