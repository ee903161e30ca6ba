//! 配置存储错误类型。
//!
//! 约定：
//! - `Display` 文本即为发送给 UI 的 `error` 字符串，不要随意改写格式
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::options_lua::LuaError;

/// 读写配置/日志/备份目录时的错误。
#[derive(Debug, Error)]
pub enum StoreError {
    /// 目标文件不存在。
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    /// 目标目录不存在。
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    /// 其它 I/O 错误（权限、共享冲突等），透传系统消息。
    #[error("{source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON 文档无法解析或序列化。
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// `options.lua` 无法解析。
    #[error("{0}")]
    Lua(#[from] LuaError),
}

impl StoreError {
    /// 包装 I/O 错误，并把 `NotFound` 归一为 [`StoreError::NotFound`]。
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}
