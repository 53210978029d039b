//! Integration tests for nbs-chat poll

use assert_cmd::cargo;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_nbs-chat");

fn setup_chat() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("room.chat");
    cargo::cargo_bin_cmd!("nbs-chat")
        .arg("create")
        .arg(&path)
        .assert()
        .success();
    (temp_dir, path)
}

fn send(path: &PathBuf, handle: &str, body: &str) {
    cargo::cargo_bin_cmd!("nbs-chat")
        .arg("send")
        .arg(path)
        .arg(handle)
        .arg(body)
        .assert()
        .success();
}

#[test]
fn test_poll_times_out_with_code_3() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "bob", "old news");

    let start = Instant::now();
    cargo::cargo_bin_cmd!("nbs-chat")
        .arg("poll")
        .arg(&path)
        .arg("alice")
        .arg("--timeout=1")
        .assert()
        .code(3)
        .stdout("");
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[test]
fn test_poll_ignores_own_messages() {
    let (_temp_dir, path) = setup_chat();

    let child = Command::new(BIN)
        .arg("poll")
        .arg(&path)
        .arg("alice")
        .arg("--timeout=2")
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(300));
    send(&path, "alice", "talking to myself");

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_poll_returns_message_from_other_handle() {
    let (_temp_dir, path) = setup_chat();

    let child = Command::new(BIN)
        .arg("poll")
        .arg(&path)
        .arg("alice")
        .arg("--timeout=10")
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(300));
    send(&path, "alice", "mine");
    send(&path, "bob", "are you there?");

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("bob: are you there?"));
    assert!(!text.contains("mine"));
}

#[test]
fn test_poll_rejects_bad_handle() {
    let (_temp_dir, path) = setup_chat();
    cargo::cargo_bin_cmd!("nbs-chat")
        .arg("poll")
        .arg(&path)
        .arg("no spaces allowed")
        .arg("--timeout=1")
        .assert()
        .code(4);
}
