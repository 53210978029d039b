//! Integration tests for nbs-chat create, send, read, search and participants

use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn chat(args: &[&str]) -> assert_cmd::Command {
    let mut cmd = cargo::cargo_bin_cmd!("nbs-chat");
    cmd.args(args);
    cmd
}

fn p(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn setup_chat() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("room.chat");
    chat(&["create", p(&path)]).assert().success();
    (temp_dir, path)
}

fn send(path: &Path, handle: &str, body: &str) {
    chat(&["send", p(path), handle, body]).assert().success();
}

#[test]
fn test_create_prints_path_and_writes_header() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("room.chat");

    chat(&["create", p(&path)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created: "));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("=== nbs-chat ===\n"));
    assert!(content.contains("last-writer: system\n"));
    assert!(content.contains(&format!("file-length: {}\n", content.len())));
}

#[test]
fn test_create_existing_fails_with_code_1() {
    let (_temp_dir, path) = setup_chat();
    chat(&["create", p(&path)])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_missing_file_exits_2() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.chat");

    chat(&["send", p(&missing), "alice", "hi"]).assert().code(2);
    chat(&["read", p(&missing)]).assert().code(2);
    chat(&["participants", p(&missing)]).assert().code(2);
    chat(&["search", p(&missing), "x"]).assert().code(2);
    chat(&["poll", p(&missing), "alice", "--timeout", "1"]).assert().code(2);
    assert!(!missing.exists());
}

#[test]
fn test_invalid_arguments_exit_4() {
    let (_temp_dir, path) = setup_chat();

    chat(&[]).assert().code(4);
    chat(&["frobnicate"]).assert().code(4);
    chat(&["send", p(&path), "alice"]).assert().code(4);
    chat(&["read", p(&path), "--last=abc"]).assert().code(4);
    chat(&["read", p(&path), "--unread=a", "--peek=a"]).assert().code(4);
    chat(&["send", p(&path), "bad handle", "hi"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_help_exits_0() {
    chat(&["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("poll"));
    chat(&["help"]).assert().success();
}

#[test]
fn test_empty_log_reads_nothing() {
    let (_temp_dir, path) = setup_chat();
    chat(&["read", p(&path)]).assert().success().stdout("");
}

#[test]
fn test_send_then_read() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "hello bob");
    send(&path, "bob", "hi alice");

    chat(&["read", p(&path)])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice: hello bob\n"))
        .stdout(predicate::str::contains("bob: hi alice\n"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("last-writer: bob\n"));
    assert!(content.contains("participants: alice(1), bob(1)\n"));
    assert!(content.contains(&format!("file-length: {}\n", content.len())));
}

#[test]
fn test_special_characters_survive() {
    let (_temp_dir, path) = setup_chat();
    let body = "quotes \"double\" 'single' \\backslash\\ $VAR `tick` line1\nline2\ttab \u{00e9}\u{4e2d}";
    send(&path, "alice", body);

    let output = chat(&["read", p(&path), "--json"]).output().unwrap();
    assert!(output.status.success());
    let messages: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["body"], body);
    assert_eq!(messages[0]["handle"], "alice");
    assert_eq!(messages[0]["ordinal"], 1);
}

#[cfg(unix)]
#[test]
fn test_non_utf8_body_round_trips() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (_temp_dir, path) = setup_chat();
    let body: Vec<u8> = vec![b'x', 0xff, 0xfe, 0x01, b'\n', 0x80, b'y'];

    let mut cmd = cargo::cargo_bin_cmd!("nbs-chat");
    cmd.arg("send")
        .arg(&path)
        .arg("alice")
        .arg(OsStr::from_bytes(&body))
        .assert()
        .success();

    let output = chat(&["read", p(&path)]).output().unwrap();
    let mut expected = b"alice: ".to_vec();
    expected.extend_from_slice(&body);
    expected.push(b'\n');
    assert!(output.stdout.ends_with(&expected));
}

#[test]
fn test_read_last_and_since() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "a1");
    send(&path, "bob", "b1");
    send(&path, "alice", "a2");
    send(&path, "carol", "c1");

    let output = chat(&["read", p(&path), "--last=2"]).output().unwrap();
    let text = String::from_utf8(output.stdout).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("alice: a2"));
    assert!(text.contains("carol: c1"));

    let output = chat(&["read", p(&path), "--since=bob"]).output().unwrap();
    let text = String::from_utf8(output.stdout).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(!text.contains("b1"));

    let output = chat(&["read", p(&path), "--since=alice", "--last", "1"])
        .output()
        .unwrap();
    let text = String::from_utf8(output.stdout).unwrap();
    assert_eq!(text.lines().collect::<Vec<_>>().len(), 1);
    assert!(text.contains("carol: c1"));
}

#[test]
fn test_unread_then_peek() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "first");
    send(&path, "alice", "second");

    chat(&["read", p(&path), "--peek=bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first"))
        .stdout(predicate::str::contains("second"));
    assert!(!temp_cursor(&path).exists());

    chat(&["read", p(&path), "--unread=bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first"));
    chat(&["read", p(&path), "--unread=bob"]).assert().success().stdout("");
    chat(&["read", p(&path), "--peek=bob"]).assert().success().stdout("");

    // carol's view is independent of bob's
    chat(&["read", p(&path), "--unread=carol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("second"));

    let cursors = fs::read_to_string(temp_cursor(&path)).unwrap();
    assert!(cursors.contains("bob=2\n"));
    assert!(cursors.contains("carol=2\n"));
}

#[test]
fn test_bodies_starting_with_dash_are_sent() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "-x");
    send(&path, "alice", "--last");
    send(&path, "bob", "-5 degrees outside");

    chat(&["read", p(&path)])
        .assert()
        .success()
        .stdout("alice: -x\nalice: --last\nbob: -5 degrees outside\n");
}

#[test]
fn test_search_pattern_starting_with_dash() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "it is -5 degrees outside");
    send(&path, "bob", "warm here");

    chat(&["search", p(&path), "-5 degrees"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-5 degrees outside"))
        .stdout(predicate::str::contains("warm").not());
}

#[test]
fn test_unread_refuses_last() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "first");
    send(&path, "alice", "second");

    chat(&["read", p(&path), "--unread=bob", "--last=1"])
        .assert()
        .code(4);
    assert!(!temp_cursor(&path).exists());

    chat(&["read", p(&path), "--unread=bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("first"))
        .stdout(predicate::str::contains("second"));
}

fn temp_cursor(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.cursors", path.display()))
}

#[test]
fn test_search() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "Deploy FAILED on staging");
    send(&path, "bob", "looking into it");
    send(&path, "alice", "deploy passed");

    chat(&["search", p(&path), "deploy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 "))
        .stdout(predicate::str::contains("#3 "))
        .stdout(predicate::str::contains("looking").not());

    chat(&["search", p(&path), "no such text"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_participants() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "1");
    send(&path, "bob", "2");
    send(&path, "alice", "3");

    chat(&["participants", p(&path)])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("2 messages"))
        .stdout(predicate::str::contains("1 message\n"));

    let output = chat(&["participants", p(&path), "--json"]).output().unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["handle"], "alice");
    assert_eq!(parsed[0]["count"], 2);
    assert_eq!(parsed[1]["handle"], "bob");
}

#[test]
fn test_corrupt_line_is_skipped() {
    let (_temp_dir, path) = setup_chat();
    send(&path, "alice", "before");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("@@@ definitely not base64 @@@\n");
    fs::write(&path, content).unwrap();
    send(&path, "bob", "after");

    chat(&["read", p(&path)])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice: before"))
        .stdout(predicate::str::contains("bob: after"));
}

#[test]
fn test_send_publishes_to_discovered_queue() {
    let temp_dir = TempDir::new().unwrap();
    let nbs = temp_dir.path().join(".nbs");
    fs::create_dir_all(nbs.join("chat")).unwrap();
    fs::create_dir_all(nbs.join("events")).unwrap();
    let path = nbs.join("chat").join("room.chat");
    chat(&["create", p(&path)]).assert().success();

    chat(&["send", p(&path), "alice", "@bob please review, cc user@example.com", "--human"])
        .assert()
        .success();

    let mut kinds: Vec<String> = fs::read_dir(nbs.join("events"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| fs::read_to_string(e.path()).unwrap_or_default())
        .filter_map(|c| {
            c.lines()
                .find_map(|l| l.strip_prefix("type: ").map(str::to_string))
        })
        .collect();
    kinds.sort();
    assert_eq!(kinds, vec!["chat-mention", "chat-message", "human-input"]);
}

#[test]
fn test_send_without_queue_still_succeeds() {
    let (temp_dir, path) = setup_chat();
    send(&path, "alice", "@bob nobody is listening");
    assert!(!temp_dir.path().join("events").exists());
}
