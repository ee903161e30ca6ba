//! 位置参数访问与分发错误。
//!
//! 约定：
//! - 缺省与 `null` 等价
//! - 标量（数字/布尔）按字符串读取时转为其文本形式
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use serde_json::Value;
use thiserror::Error;

/// 处理器无法产生结果时的错误；由桥接层统一转换为 `{success:false, error}`。
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Missing argument #{index} ({name})")]
    MissingArgument { index: usize, name: &'static str },
    #[error("Invalid argument #{index} ({name}): expected {expected}")]
    InvalidArgument {
        index: usize,
        name: &'static str,
        expected: &'static str,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 请求参数列表的只读视图。
#[derive(Debug, Clone, Copy)]
pub struct Args<'a>(&'a [Value]);

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self(values)
    }

    /// 第 `index` 个参数；缺省或 `null` 返回 `None`。
    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.0.get(index).filter(|v| !v.is_null())
    }

    /// 必填字符串参数。
    pub fn string(&self, index: usize, name: &'static str) -> Result<String, DispatchError> {
        self.opt_string(index, name)?
            .ok_or(DispatchError::MissingArgument { index, name })
    }

    /// 可选字符串参数。
    pub fn opt_string(&self, index: usize, name: &'static str) -> Result<Option<String>, DispatchError> {
        match self.get(index) {
            None => Ok(None),
            Some(v) => scalar_text(v).map(Some).ok_or(DispatchError::InvalidArgument {
                index,
                name,
                expected: "string",
            }),
        }
    }

    /// 字符串数组参数（脚本参数）；缺省为空，单个字符串视为一个元素。
    pub fn string_list(&self, index: usize, name: &'static str) -> Result<Vec<String>, DispatchError> {
        let invalid = DispatchError::InvalidArgument {
            index,
            name,
            expected: "array of strings",
        };
        match self.get(index) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| scalar_text(v).ok_or(()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid),
            Some(v) => scalar_text(v).map(|s| vec![s]).ok_or(invalid),
        }
    }

    /// 必填的任意 JSON 参数。
    pub fn value(&self, index: usize, name: &'static str) -> Result<&'a Value, DispatchError> {
        self.get(index).ok_or(DispatchError::MissingArgument { index, name })
    }
}
