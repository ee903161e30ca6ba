//! 方法结果载荷（`{success, error?, ...}` 统一形态）。
//!
//! 形态约定：
//! - 成功：`{ success: true, <字段...> }`
//! - 失败：`{ success: false, error?: string, <字段...> }`
//! - 取消（对话框）：`{ success: false, cancelled: true }`，不带 `error`
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// 方法特有字段集合（`content`、`parsed`、`backups` 等）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个字段。
    ///
    /// 异常处理：
    /// - 值无法转换为 JSON（例如键不是字符串的映射）时降级为 `null`
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// 单个方法的结果（成功携带载荷 / 失败携带消息）。
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    Success(Payload),
    Failure {
        error: Option<String>,
        payload: Payload,
    },
}

impl MethodResult {
    /// 无附加字段的成功结果。
    pub fn ok() -> Self {
        Self::Success(Payload::new())
    }

    pub fn success(payload: Payload) -> Self {
        Self::Success(payload)
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: Some(error.into()),
            payload: Payload::new(),
        }
    }

    /// 带附加字段的失败结果（例如 `exitCode`、`stdout`）。
    pub fn failure_with(error: impl Into<String>, payload: Payload) -> Self {
        Self::Failure {
            error: Some(error.into()),
            payload,
        }
    }

    /// 按进程退出码决定成功与否，失败时不带 `error` 字段。
    pub fn from_exit(success: bool, payload: Payload) -> Self {
        if success {
            Self::Success(payload)
        } else {
            Self::Failure { error: None, payload }
        }
    }

    /// 用户取消（文件/目录选择对话框）。
    pub fn cancelled() -> Self {
        Self::Failure {
            error: None,
            payload: Payload::new().with("cancelled", true),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// 转换为线上 JSON 对象；`success`/`error` 不会被载荷覆盖。
    pub fn to_value(&self) -> Value {
        let (success, error, payload) = match self {
            Self::Success(p) => (true, None, p),
            Self::Failure { error, payload } => (false, error.as_ref(), payload),
        };
        let mut map = payload.0.clone();
        map.insert("success".to_string(), Value::Bool(success));
        match error {
            Some(e) => {
                map.insert("error".to_string(), Value::String(e.clone()));
            }
            None => {
                map.remove("error");
            }
        }
        Value::Object(map)
    }
}

impl Serialize for MethodResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_carries_payload() {
        let r = MethodResult::success(Payload::new().with("path", "C:\\DCS-Max"));
        assert_eq!(r.to_value(), json!({"success": true, "path": "C:\\DCS-Max"}));
    }

    #[test]
    fn payload_cannot_override_status_fields() {
        let r = MethodResult::success(Payload::new().with("success", false).with("error", "x"));
        assert_eq!(r.to_value(), json!({"success": true}));
    }

    #[test]
    fn failure_shapes() {
        assert_eq!(
            MethodResult::failure("File not found: x").to_value(),
            json!({"success": false, "error": "File not found: x"})
        );
        assert_eq!(MethodResult::cancelled().to_value(), json!({"success": false, "cancelled": true}));
        let exit = MethodResult::from_exit(false, Payload::new().with("code", 2));
        assert_eq!(exit.to_value(), json!({"success": false, "code": 2}));
    }
}
