use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use dcsmax_core::config::HostConfig;
use dcsmax_host::context::HostContext;
use dcsmax_host::transport::serve_session;
use serde_json::Value;
use tokio::io::AsyncReadExt;

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

/// 跑完整个会话，按 id 收集响应。
async fn run_session(root: PathBuf, input: Vec<u8>) -> BTreeMap<i64, Value> {
    let ctx = Arc::new(HostContext::new(HostConfig::default(), root));
    let (writer, mut output) = tokio::io::duplex(64 * 1024);
    serve_session(ctx, &input[..], writer).await.expect("session");

    let mut text = String::new();
    output.read_to_string(&mut text).await.expect("read output");
    let mut by_id = BTreeMap::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let v: Value = serde_json::from_str(line).unwrap_or_else(|e| panic!("not JSON ({e}): {line}"));
        let id = v["id"].as_i64().expect("response id");
        assert!(by_id.insert(id, v["result"].clone()).is_none(), "duplicate id {id}");
    }
    by_id
}

#[tokio::test]
async fn invalid_utf8_lines_do_not_end_the_session() {
    let dir = unique_temp_dir("dcsmax-transport-utf8");
    let _cleanup = CleanupDir(dir.clone());

    let mut input = Vec::new();
    input.extend_from_slice(b"{\"id\":1,\"method\":\"readIniConfig\",\"args\":[\"m\xff.ini\"]}\n");
    input.extend_from_slice(b"\xfe\xff garbage\r\n");
    input.extend_from_slice(b"{\"id\":2,\"method\":\"getProjectRoot\",\"args\":[]}\n");

    let by_id = run_session(dir.clone(), input).await;

    assert_eq!(by_id.len(), 3, "{by_id:?}");
    assert_eq!(by_id[&1]["success"], false);
    assert!(by_id[&1]["error"].as_str().unwrap().starts_with("File not found: "));
    assert!(by_id[&0]["error"].as_str().unwrap().starts_with("Invalid request: "));
    assert_eq!(by_id[&2]["path"], &*dir.to_string_lossy());
}

#[tokio::test]
async fn crlf_and_blank_lines_are_tolerated() {
    let dir = unique_temp_dir("dcsmax-transport-crlf");
    let _cleanup = CleanupDir(dir.clone());

    let input = b"\r\n\n{\"id\":4,\"method\":\"getProjectRoot\",\"args\":[]}\r\n{\"id\":5,\"method\":\"getProjectRoot\",\"args\":[]}".to_vec();
    let by_id = run_session(dir, input).await;

    assert_eq!(by_id.keys().copied().collect::<Vec<_>>(), vec![4, 5]);
    assert!(by_id.values().all(|r| r["success"] == true));
}
