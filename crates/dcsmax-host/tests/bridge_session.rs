use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dcsmax_core::config::HostConfig;
use dcsmax_core::ipc::{Event, OutputStream, Outbound, Response};
use dcsmax_host::bridge::Bridge;
use dcsmax_host::context::HostContext;
use dcsmax_host::sink::EnvelopeSink;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

struct CleanupDir(PathBuf);

impl Drop for CleanupDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn bridge_at(root: &Path) -> (Bridge, UnboundedReceiver<Outbound>) {
    let config = HostConfig {
        log_settle_ms: 50,
        ..HostConfig::default()
    };
    let ctx = Arc::new(HostContext::new(config, root.to_path_buf()));
    let (sink, rx) = EnvelopeSink::channel();
    (Bridge::new(ctx, sink), rx)
}

async fn next(rx: &mut UnboundedReceiver<Outbound>, wait: Duration) -> Option<Outbound> {
    tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
}

async fn next_response(rx: &mut UnboundedReceiver<Outbound>) -> Response {
    match next(rx, Duration::from_secs(10)).await {
        Some(Outbound::Response(r)) => r,
        other => panic!("expected a response, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_method_is_a_normal_failure() {
    let dir = unique_temp_dir("dcsmax-bridge-unknown");
    let _cleanup = CleanupDir(dir.clone());
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"id":3,"method":"launchRocket","args":[]}"#);
    let resp = next_response(&mut rx).await;
    assert_eq!(resp.id, 3);
    assert_eq!(
        resp.result,
        json!({"success": false, "error": "Unknown method: launchRocket"})
    );
}

#[tokio::test]
async fn unparsable_envelope_answers_with_id_zero() {
    let dir = unique_temp_dir("dcsmax-bridge-invalid");
    let _cleanup = CleanupDir(dir.clone());
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message("{not json");
    let resp = next_response(&mut rx).await;
    assert_eq!(resp.id, 0);
    assert_eq!(resp.result["success"], false);
    assert!(resp.result["error"].as_str().unwrap().starts_with("Invalid request: "));
}

#[tokio::test]
async fn handler_errors_keep_the_request_id() {
    let dir = unique_temp_dir("dcsmax-bridge-args");
    let _cleanup = CleanupDir(dir.clone());
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"id":9,"method":"readIniConfig","args":[]}"#);
    let resp = next_response(&mut rx).await;
    assert_eq!(resp.id, 9);
    assert_eq!(
        resp.result["error"],
        "Host exception: Missing argument #0 (path)"
    );
}

#[tokio::test]
async fn each_request_gets_exactly_one_response() {
    let dir = unique_temp_dir("dcsmax-bridge-one");
    let _cleanup = CleanupDir(dir.clone());
    std::fs::write(dir.join("m.ini"), "[A]\nk = v\n").unwrap();
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"id":5,"method":"getProjectRoot","args":[]}"#);
    bridge.handle_message(r#"{"id":6,"method":"readJsonConfig","args":["missing.json"]}"#);
    // WebView 形式：整条信封被再编码成 JSON 字符串。
    bridge.handle_message(r#""{\"id\":7,\"method\":\"readIniConfig\",\"args\":[\"m.ini\"]}""#);

    let mut by_id = BTreeMap::new();
    for _ in 0..3 {
        let resp = next_response(&mut rx).await;
        assert!(by_id.insert(resp.id, resp.result).is_none(), "duplicate id");
    }
    assert!(next(&mut rx, Duration::from_millis(300)).await.is_none());

    assert_eq!(by_id[&5]["path"], &*dir.to_string_lossy());
    assert!(by_id[&6]["error"].as_str().unwrap().starts_with("File not found: "));
    assert_eq!(by_id[&7]["parsed"], json!({"A": {"k": "v"}}));
}

#[tokio::test]
async fn stop_script_twice_is_silent() {
    let dir = unique_temp_dir("dcsmax-bridge-stop");
    let _cleanup = CleanupDir(dir.clone());
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"id":0,"method":"stopScript","args":[]}"#);
    bridge.handle_message(r#"{"id":0,"method":"stopScript","args":[]}"#);
    bridge.handle_message(r#"{"method":"stopWatchLog"}"#);
    assert!(next(&mut rx, Duration::from_millis(300)).await.is_none());
}

#[tokio::test]
async fn missing_autohotkey_script_completes_with_code_one() {
    let dir = unique_temp_dir("dcsmax-bridge-ahk");
    let _cleanup = CleanupDir(dir.clone());
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"method":"executeScriptStream","args":["bench/missing.ahk",["--close-apps"]]}"#);

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let complete = loop {
        match next(&mut rx, Duration::from_secs(10)).await {
            Some(Outbound::Event(Event::ScriptOutput(o))) => match o.stream {
                OutputStream::Stdout => stdout.push(o.data),
                OutputStream::Stderr => stderr.push(o.data),
            },
            Some(Outbound::Event(Event::ScriptComplete(c))) => break c,
            other => panic!("unexpected envelope: {other:?}"),
        }
    };

    assert_eq!(stdout.len(), 2);
    assert!(stdout[0].starts_with("Using AutoHotkey: "));
    assert!(stdout[1].starts_with("Script: "));
    assert_eq!(stderr.len(), 1);
    assert!(stderr[0].starts_with("ERROR: Script file not found: "));
    assert!(stderr[0].ends_with("missing.ahk\n"));
    assert_eq!(complete.code, 1);
    assert_eq!(complete.stdout, "");
    assert_eq!(complete.stderr, "Script not found");
    assert!(next(&mut rx, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn watch_log_emits_current_content_once_then_changes() {
    let dir = unique_temp_dir("dcsmax-bridge-watch");
    let _cleanup = CleanupDir(dir.clone());
    std::fs::create_dir_all(dir.join("logs")).unwrap();
    std::fs::write(dir.join("logs").join("bench.log"), "hello").unwrap();
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"method":"watchLog","args":["logs/bench.log"]}"#);
    match next(&mut rx, Duration::from_secs(5)).await {
        Some(Outbound::Event(Event::LogUpdated(u))) => assert_eq!(u.content, "hello"),
        other => panic!("expected logUpdated, got {other:?}"),
    }
    assert!(next(&mut rx, Duration::from_millis(400)).await.is_none());

    std::fs::write(dir.join("logs").join("bench.log"), "hello\nworld").unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match next(&mut rx, remaining).await {
            Some(Outbound::Event(Event::LogUpdated(u))) if u.content == "hello\nworld" => break,
            Some(Outbound::Event(Event::LogUpdated(_))) => continue,
            other => panic!("expected updated content, got {other:?}"),
        }
    }

    bridge.handle_message(r#"{"method":"stopWatchLog","args":[]}"#);
}

#[tokio::test]
async fn stop_right_after_watch_cancels_it() {
    let dir = unique_temp_dir("dcsmax-bridge-cancel");
    let _cleanup = CleanupDir(dir.clone());
    std::fs::write(dir.join("bench.log"), "hello").unwrap();
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"method":"watchLog","args":["bench.log"]}"#);
    bridge.handle_message(r#"{"method":"stopWatchLog","args":[]}"#);
    assert!(next(&mut rx, Duration::from_millis(500)).await.is_none());

    std::fs::write(dir.join("bench.log"), "hello\nworld").unwrap();
    assert!(next(&mut rx, Duration::from_millis(500)).await.is_none());
}

#[tokio::test]
async fn watching_an_empty_file_is_silent() {
    let dir = unique_temp_dir("dcsmax-bridge-empty");
    let _cleanup = CleanupDir(dir.clone());
    std::fs::write(dir.join("empty.log"), "").unwrap();
    let (bridge, mut rx) = bridge_at(&dir);

    bridge.handle_message(r#"{"method":"watchLog","args":["empty.log"]}"#);
    assert!(next(&mut rx, Duration::from_millis(400)).await.is_none());
    bridge.shutdown();
}
