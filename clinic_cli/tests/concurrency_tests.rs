//! Concurrency tests for the clinic binary.
//!
//! These tests verify that multiple processes can safely:
//! - Race to book the same slot (exactly one wins)
//! - Book different slots simultaneously without losing writes
//! - Register accounts concurrently with stable patient ids

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "[booking]\nfee = 100\n")
        .expect("Failed to write config");
    temp_dir
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("clinic"));
    cmd.arg("--data-dir")
        .arg(dir.join("data"))
        .arg("--config")
        .arg(dir.join("config.toml"));
    cmd
}

fn register(dir: &Path, account: &str, role: &str) {
    let mut cmd = cli(dir);
    cmd.args(["--account", account, "register", "--name", account, "--role", role]);
    if role == "patient" {
        cmd.args(["--age", "30", "--gender", "female", "--district", "Central"]);
    }
    cmd.timeout(Duration::from_secs(10)).assert().success();
}

fn read_journal(dir: &Path) -> Vec<serde_json::Value> {
    let path = dir.join("data/appointments.jsonl");
    let content = fs::read_to_string(&path).expect("Failed to read journal");
    content
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).expect("Journal contains invalid JSON"))
        .collect()
}

#[test]
fn test_racing_processes_book_slot_once() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    register(&dir, "0xdoc", "doctor");
    for i in 0..8 {
        register(&dir, &format!("0xpatient{}", i), "patient");
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["--account", format!("0xpatient{}", i).as_str(), "book", "0xdoc", "3"])
                    .timeout(Duration::from_secs(10))
                    .output()
                    .expect("Failed to run clinic")
            })
        })
        .collect();

    let outputs: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();

    let winners = outputs.iter().filter(|o| o.status.success()).count();
    assert_eq!(winners, 1, "Expected exactly one successful booking");

    for output in outputs.iter().filter(|o| !o.status.success()) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("already booked"), "unexpected error: {}", stderr);
    }

    let journal = read_journal(&dir);
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0]["slot"], 3);
}

#[test]
fn test_parallel_bookings_of_distinct_slots() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    register(&dir, "0xdoc", "doctor");
    for i in 0..5 {
        register(&dir, &format!("0xpatient{}", i), "patient");
    }

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["--account", format!("0xpatient{}", i).as_str()])
                    .args(["book", "0xdoc", i.to_string().as_str()])
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let output = cli(&dir)
        .args(["schedule", "0xdoc"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&output);
    assert!(!stdout.contains("No appointment"));
    assert_eq!(read_journal(&dir).len(), 5);
}

#[test]
fn test_concurrent_registrations_keep_ids_dense() {
    let temp_dir = setup_test_dir();
    let dir: PathBuf = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let dir = dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 3));
                register(&dir, &format!("0xpatient{}", i), "patient");
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let records = fs::read_to_string(dir.join("data/records.json")).expect("Failed to read records");
    let parsed: serde_json::Value = serde_json::from_str(&records).expect("Invalid records JSON");
    let ids: Vec<u64> = parsed["patients"]
        .as_array()
        .expect("patients array missing")
        .iter()
        .map(|p| p["id"].as_u64().expect("id missing"))
        .collect();

    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
}
