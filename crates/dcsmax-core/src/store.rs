//! 配置文件读写（整文件替换，无原子性保证）。
//!
//! 说明：
//! - 文本读取容忍 UTF-8 BOM 与非法字节（按有损解码）
//! - JSON 写入统一为 2 空格缩进
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// 读取整个文本文件。
pub fn read_text(path: &Path) -> Result<String, StoreError> {
    let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// 以调用方提供的内容替换整个文件（父目录不会自动创建）。
pub fn write_text(path: &Path, content: &str) -> Result<(), StoreError> {
    std::fs::write(path, content).map_err(|e| StoreError::io(path, e))
}

/// 读取 JSON 文档，返回 `(原始文本, 解析结果)`。
///
/// 异常处理：
/// - 文件不存在：`File not found: <path>`
/// - JSON 格式错误：透传解析错误消息
pub fn read_json(path: &Path) -> Result<(String, Value), StoreError> {
    if !path.is_file() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let content = read_text(path)?;
    let data = serde_json::from_str(&content)?;
    Ok((content, data))
}

/// 以缩进格式写入 JSON 文档。
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(value)?;
    write_text(path, &text)
}

/// 目录列表（仅名称，按名称排序）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub files: Vec<String>,
    pub directories: Vec<String>,
}

/// 列出目录的直接子项。
pub fn list_directory(dir: &Path) -> Result<DirectoryListing, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::DirectoryNotFound(dir.to_path_buf()));
    }
    let mut listing = DirectoryListing::default();
    for item in std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let item = item.map_err(|e| StoreError::io(dir, e))?;
        let name = item.file_name().to_string_lossy().into_owned();
        if item.path().is_dir() {
            listing.directories.push(name);
        } else {
            listing.files.push(name);
        }
    }
    listing.files.sort();
    listing.directories.sort();
    Ok(listing)
}
