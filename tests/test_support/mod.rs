#![allow(dead_code)]

use serde_json::json;
use slidekit::clock::ManualClock;
use slidekit::config::DeckConfig;
use slidekit::storage::{MemoryStorage, SharedMemoryStorage};
use slidekit::Homework;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const START_MS: i64 = 1_760_000_000_000;
pub const CURRENT_KEY: &str = "misy261_homework1_v3";
pub const LEGACY_KEYS: [&str; 2] = ["misy261_homework1_v2", "misy261_homework1_v1"];
pub const SESSION_KEY: &str = "misy261_homework1_identity_session";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_slidekitd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn slidekitd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Returns the error code of a request that must fail.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value.get("error").cloned().unwrap_or_else(|| json!({}))
}

/// A deck on in-memory storage with a hand-driven clock. `storage` stays
/// readable from the test after the deck takes its boxed copy.
pub struct Fixture {
    pub deck: Homework,
    pub clock: ManualClock,
    pub storage: SharedMemoryStorage,
}

pub fn open_fixture(storage: SharedMemoryStorage) -> Fixture {
    open_fixture_with(storage, DeckConfig::default())
}

pub fn open_fixture_with(storage: SharedMemoryStorage, config: DeckConfig) -> Fixture {
    let clock = ManualClock::new(START_MS);
    let deck = Homework::open(
        config,
        Box::new(storage.clone()),
        Box::new(MemoryStorage::new()),
        Box::new(clock.clone()),
    );
    Fixture {
        deck,
        clock,
        storage,
    }
}

pub fn slide_index(key: &str) -> i64 {
    slidekit::deck::SLIDES
        .iter()
        .position(|s| s.key == key)
        .expect("known slide") as i64
}

pub fn goto(fx: &mut Fixture, key: &str) {
    fx.deck.navigate(slide_index(key)).expect("navigate");
}

pub fn stored_document(storage: &SharedMemoryStorage, key: &str) -> Option<serde_json::Value> {
    use slidekit::storage::Storage;
    storage
        .get_item(key)
        .expect("read storage")
        .map(|raw| serde_json::from_str(&raw).expect("stored json"))
}

pub fn lock_identity(fx: &mut Fixture, first: &str, last: &str, section: &str) {
    goto(fx, "welcome");
    fx.deck.welcome_set_name(first, last).expect("set name");
    fx.deck.welcome_set_section(section).expect("set section");
    fx.deck.welcome_record().expect("record identity");
}
