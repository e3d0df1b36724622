//! Concurrency tests for itrack.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the entry log simultaneously (file locking)
//! - Roll up the log while other processes append to it
//! - Update different profile fields simultaneously (writer lock)

use assert_cmd::Command;
use chrono::Utc;
use insulin_core::config::EntryDefaults;
use insulin_core::csv_rollup::wal_to_csv_and_archive;
use insulin_core::{EntryDraft, EntrySink, JsonlStore};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("itrack"));
    cmd.env("ITRACK_CONFIG", data_dir.join("config.toml"))
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_concurrent_entry_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..10u64)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 2));
                let reading = (100 + i).to_string();
                cli(&data_dir)
                    .args(["log", "--type", "lunch", "--reading", &reading])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Logging thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("log/entries.jsonl"))
        .expect("Failed to read entry log");
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 10, "Expected 10 entries, got {}", lines.len());

    // Every line is a complete record
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
        assert_eq!(value["entryType"], "Lunch");
    }
}

#[test]
fn test_concurrent_profile_saves() {
    for round in 0..3 {
        let temp_dir = setup_test_dir();
        let data_dir = temp_dir.path().to_path_buf();

        let edits: [[&str; 2]; 3] = [
            ["--first-name", "Ada"],
            ["--last-name", "Lovelace"],
            ["--gender", "female"],
        ];
        let handles: Vec<_> = edits
            .into_iter()
            .map(|[flag, value]| {
                let data_dir = data_dir.clone();
                thread::spawn(move || {
                    cli(&data_dir)
                        .args(["profile", flag, value])
                        .assert()
                        .success();
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Profile thread panicked");
        }

        let content = std::fs::read_to_string(data_dir.join("profile.json"))
            .expect("Failed to read profile");
        let value: serde_json::Value =
            serde_json::from_str(&content).expect("valid profile JSON");
        assert_eq!(value["first_name"], "Ada", "round {}", round);
        assert_eq!(value["last_name"], "Lovelace", "round {}", round);
        assert_eq!(value["gender"], "Female", "round {}", round);
    }
}

#[test]
fn test_rollup_while_logging_keeps_every_entry() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let loggers: Vec<_> = (0..8u64)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                let reading = (100 + i).to_string();
                cli(&data_dir)
                    .args(["log", "--type", "daily", "--reading", &reading])
                    .assert()
                    .success();
            })
        })
        .collect();

    let roller_dir = data_dir.clone();
    let roller = thread::spawn(move || {
        for _ in 0..4 {
            cli(&roller_dir).arg("rollup").assert().success();
            thread::sleep(Duration::from_millis(3));
        }
    });

    for handle in loggers {
        handle.join().expect("Logging thread panicked");
    }
    roller.join().expect("Rollup thread panicked");

    cli(&data_dir).arg("rollup").assert().success();

    let mut reader = csv::Reader::from_path(data_dir.join("entries.csv")).expect("CSV exists");
    assert_eq!(reader.records().count(), 8);

    cli(&data_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicates::str::contains("8 entries"));
}

#[test]
fn test_rollup_while_appending_in_process() {
    let temp_dir = setup_test_dir();
    let wal_path = temp_dir.path().join("log/entries.jsonl");
    let csv_path = temp_dir.path().join("entries.csv");

    let writer_path = wal_path.clone();
    let writer = thread::spawn(move || {
        let mut store = JsonlStore::new(&writer_path);
        let defaults = EntryDefaults::default();
        for i in 0..500u32 {
            let mut draft = EntryDraft::new(&defaults, Utc::now());
            draft.set_reading(&(80 + i % 200).to_string());
            let entry = draft.submit(Utc::now()).expect("valid draft");
            store.append(&entry).expect("append");
        }
    });

    let mut rolled = 0;
    while !writer.is_finished() {
        rolled += wal_to_csv_and_archive(&wal_path, &csv_path).expect("rollup");
    }
    writer.join().expect("Writer thread panicked");
    rolled += wal_to_csv_and_archive(&wal_path, &csv_path).expect("rollup");

    assert_eq!(rolled, 500);
    let mut reader = csv::Reader::from_path(&csv_path).expect("CSV exists");
    assert_eq!(reader.records().count(), 500);
}

#[test]
fn test_reads_during_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let writer_dir = data_dir.clone();
    let writer = thread::spawn(move || {
        for _ in 0..3 {
            cli(&writer_dir)
                .args(["log", "--type", "dinner", "--reading", "180"])
                .assert()
                .success();
        }
    });

    for _ in 0..3 {
        cli(&data_dir).arg("history").assert().success();
        thread::sleep(Duration::from_millis(5));
    }

    writer.join().expect("Writer thread panicked");

    cli(&data_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicates::str::contains("3 entries"));
}
