//! UI ↔ 宿主协议定义（请求/响应/事件信封）。
//!
//! 协议形态：
//! - 每条消息是一个 JSON 对象，按“单行一条消息”传输
//! - 请求：`{ id, method, args: [...] }`，`id` 用于请求-响应关联（0/缺省表示无需关联）
//! - 响应：`{ id, result }`
//! - 事件：`{ event, data }`，不与任何请求关联
//!
//! 兼容性：
//! - WebView 侧可能把整条信封再包一层 JSON 字符串发送，解析时会解包一次
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::reply::MethodResult;

/// 请求 ID（与 UI 侧 `_requestId` 自增计数器一致）。
pub type RequestId = i64;

/// 信封解析失败。
///
/// 说明：
/// - 这类错误发生在 `id` 被读出之前，因此对应的错误响应只能使用 `id = 0`。
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope must be a JSON object")]
    NotAnObject,
    #[error("envelope id must be an integer")]
    InvalidId,
}

/// 已解析的请求信封。
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// 关联 ID；缺省或 `null` 时为 0。
    pub id: RequestId,
    /// 方法名；缺省时为空字符串（会按未知方法处理）。
    pub method: String,
    /// 位置参数；缺省或非数组时为空列表。
    pub args: Vec<Value>,
}

impl Request {
    /// 从一行文本解析请求信封。
    ///
    /// 参数：
    /// - `text`：UI 发送的原始文本
    ///
    /// 返回值：
    /// - 成功：返回 [`Request`]
    ///
    /// 异常处理：
    /// - 非法 JSON、非对象、`id` 不是整数时返回 [`EnvelopeError`]
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let mut value: Value = serde_json::from_str(text.trim())?;
        // postMessage(JSON.stringify(...)) 在部分宿主里会被再次字符串化。
        if let Value::String(inner) = &value {
            value = serde_json::from_str(inner)?;
        }
        let Value::Object(map) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let id = match map.get("id") {
            None | Some(Value::Null) => 0,
            Some(Value::String(s)) => s.trim().parse().map_err(|_| EnvelopeError::InvalidId)?,
            Some(v) => v.as_i64().ok_or(EnvelopeError::InvalidId)?,
        };
        let method = match map.get("method") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let args = match map.get("args") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(Self { id, method, args })
    }
}

/// 方法目录（UI 可调用的全部方法）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    ReadIniConfig,
    WriteIniConfig,
    ReadJsonConfig,
    WriteJsonConfig,
    ReadOptimizationConfig,
    WriteOptimizationConfig,
    GetOptimizationConfigPath,
    ExecuteScript,
    ExecuteScriptStream,
    StopScript,
    ListBackups,
    ImportRegistry,
    ReadLog,
    WatchLog,
    StopWatchLog,
    GetSystemInfo,
    IsAdmin,
    GetProjectRoot,
    ListDirectory,
    GetServices,
    CreateRestorePoint,
    OpenFile,
    BrowseForFile,
    BrowseForFolder,
    ExecuteCommand,
    OpenExternal,
    DetectPaths,
    ReadSettingsPaths,
    WriteSettingsPaths,
    ReadOptionsLua,
    LaunchVrSoftware,
    LaunchDcsWithMission,
    SendMissionRestart,
}

/// 方法名与枚举的对应表（线上名称不可更改）。
const CATALOG: &[(&str, Method)] = &[
    ("readIniConfig", Method::ReadIniConfig),
    ("writeIniConfig", Method::WriteIniConfig),
    ("readJsonConfig", Method::ReadJsonConfig),
    ("writeJsonConfig", Method::WriteJsonConfig),
    ("readOptimizationConfig", Method::ReadOptimizationConfig),
    ("writeOptimizationConfig", Method::WriteOptimizationConfig),
    ("getOptimizationConfigPath", Method::GetOptimizationConfigPath),
    ("executeScript", Method::ExecuteScript),
    ("executeScriptStream", Method::ExecuteScriptStream),
    ("stopScript", Method::StopScript),
    ("listBackups", Method::ListBackups),
    ("importRegistry", Method::ImportRegistry),
    ("readLog", Method::ReadLog),
    ("watchLog", Method::WatchLog),
    ("stopWatchLog", Method::StopWatchLog),
    ("getSystemInfo", Method::GetSystemInfo),
    ("isAdmin", Method::IsAdmin),
    ("getProjectRoot", Method::GetProjectRoot),
    ("listDirectory", Method::ListDirectory),
    ("getServices", Method::GetServices),
    ("createRestorePoint", Method::CreateRestorePoint),
    ("openFile", Method::OpenFile),
    ("browseForFile", Method::BrowseForFile),
    ("browseForFolder", Method::BrowseForFolder),
    ("executeCommand", Method::ExecuteCommand),
    ("openExternal", Method::OpenExternal),
    ("detectPaths", Method::DetectPaths),
    ("readSettingsPaths", Method::ReadSettingsPaths),
    ("writeSettingsPaths", Method::WriteSettingsPaths),
    ("readOptionsLua", Method::ReadOptionsLua),
    ("launchVRSoftware", Method::LaunchVrSoftware),
    ("launchDCSWithMission", Method::LaunchDcsWithMission),
    ("sendMissionRestart", Method::SendMissionRestart),
];

impl Method {
    /// 按线上方法名查找；未知名称返回 `None`。
    pub fn from_name(name: &str) -> Option<Self> {
        CATALOG.iter().find(|(n, _)| *n == name).map(|(_, m)| *m)
    }

    /// 线上方法名。
    pub fn name(self) -> &'static str {
        CATALOG
            .iter()
            .find(|(_, m)| *m == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }

    /// 全部方法（目录顺序）。
    pub fn all() -> impl Iterator<Item = Method> {
        CATALOG.iter().map(|(_, m)| *m)
    }

    /// 是否为“只发不回”的会话方法（永不产生响应信封）。
    pub fn is_fire_and_forget(self) -> bool {
        matches!(
            self,
            Method::ExecuteScriptStream | Method::StopScript | Method::WatchLog | Method::StopWatchLog
        )
    }
}

/// 响应信封。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: RequestId,
    pub result: Value,
}

impl Response {
    /// 由方法结果构造响应。
    pub fn new(id: RequestId, result: &MethodResult) -> Self {
        Self {
            id,
            result: result.to_value(),
        }
    }
}

/// 脚本输出所属的流。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// `scriptOutput` 事件数据：一行输出（已带 `\n`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutput {
    #[serde(rename = "type")]
    pub stream: OutputStream,
    pub data: String,
}

/// `scriptComplete` 事件数据：退出码与完整输出。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptComplete {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// `logUpdated` 事件数据：被监视文件的完整内容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogUpdated {
    pub content: String,
}

/// 事件信封（主动推送给 UI，不关联请求）。
///
/// 序列化格式：
/// - `{"event": "scriptOutput", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Event {
    ScriptOutput(ScriptOutput),
    ScriptComplete(ScriptComplete),
    LogUpdated(LogUpdated),
}

impl Event {
    /// 一行 stdout 输出（自动补 `\n`）。
    pub fn stdout(line: impl AsRef<str>) -> Self {
        Self::output(OutputStream::Stdout, line)
    }

    /// 一行 stderr 输出（自动补 `\n`）。
    pub fn stderr(line: impl AsRef<str>) -> Self {
        Self::output(OutputStream::Stderr, line)
    }

    /// 指定流上的一行输出（自动补 `\n`）。
    pub fn output(stream: OutputStream, line: impl AsRef<str>) -> Self {
        Event::ScriptOutput(ScriptOutput {
            stream,
            data: format!("{}\n", line.as_ref()),
        })
    }

    pub fn complete(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Event::ScriptComplete(ScriptComplete {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        })
    }

    pub fn log(content: impl Into<String>) -> Self {
        Event::LogUpdated(LogUpdated {
            content: content.into(),
        })
    }
}

/// 发往 UI 的信封（响应或事件），共用同一发送通道。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outbound {
    Response(Response),
    Event(Event),
}

impl Outbound {
    /// 序列化为单行 JSON（不含结尾换行）。
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
