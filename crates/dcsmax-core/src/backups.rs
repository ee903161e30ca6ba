//! 备份目录枚举。
//!
//! 命名约定（由外部备份脚本产生）：
//! - 子目录：DCS 设置备份
//! - `*-services-backup.json`：Windows 服务启动类型备份
//! - `*-tasks-backup.xml`：计划任务备份
//! - `*-registry-backup.reg`：注册表项备份
//! - `_` 开头的条目为脚本内部使用，不展示
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::StoreError;

/// 备份类型（序列化为 UI 展示用的名称）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupKind {
    #[serde(rename = "DCS Settings")]
    DcsSettings,
    #[serde(rename = "Windows Services")]
    WindowsServices,
    #[serde(rename = "Scheduled Tasks")]
    ScheduledTasks,
    #[serde(rename = "Registry Keys")]
    RegistryKeys,
}

const SUFFIXES: &[(&str, BackupKind)] = &[
    ("-services-backup.json", BackupKind::WindowsServices),
    ("-tasks-backup.xml", BackupKind::ScheduledTasks),
    ("-registry-backup.reg", BackupKind::RegistryKeys),
];

impl BackupKind {
    /// 按名称与条目类型归类；不属于任何备份类型时返回 `None`。
    pub fn classify(name: &str, is_dir: bool) -> Option<Self> {
        if name.starts_with('_') {
            return None;
        }
        if is_dir {
            return Some(Self::DcsSettings);
        }
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, kind)| *kind)
    }
}

/// 单个备份条目。
///
/// 字段说明：
/// - `date`：最后修改时间（RFC 3339）
/// - `size`：文件字节数；目录固定为 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BackupKind,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub size: u64,
}

/// 列出备份目录中的条目（按日期从新到旧）。
///
/// 异常处理：
/// - 目录不存在返回 [`StoreError::DirectoryNotFound`]
/// - 单个条目元数据读取失败时跳过该条目
pub fn list_backups(dir: &Path) -> Result<Vec<BackupEntry>, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::DirectoryNotFound(dir.to_path_buf()));
    }
    let read = std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut entries = Vec::new();
    for item in read {
        let Ok(item) = item else { continue };
        let name = item.file_name().to_string_lossy().into_owned();
        let Ok(meta) = item.metadata() else {
            debug!(name = %name, "读取备份条目元数据失败，已跳过");
            continue;
        };
        let Some(kind) = BackupKind::classify(&name, meta.is_dir()) else {
            continue;
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push(BackupEntry {
            name,
            kind,
            date: OffsetDateTime::from(modified),
            size: if meta.is_dir() { 0 } else { meta.len() },
        });
    }
    entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}
