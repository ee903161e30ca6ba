//! 宿主配置（dcs-max-host.json）。
//!
//! 说明：
//! - 所有字段均可省略，缺省值即为发布包的目录约定
//! - 配置文件不存在时使用默认值，不视为错误
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths::DEFAULT_MARKER_DIR;

/// 默认配置文件名（位于宿主 exe 同目录）。
pub const CONFIG_FILE_NAME: &str = "dcs-max-host.json";

/// AutoHotkey v2 的默认搜索顺序（`%VAR%` 在使用时展开）。
pub const DEFAULT_AUTOHOTKEY_CANDIDATES: &[&str] = &[
    "%ProgramFiles%\\AutoHotkey\\v2\\AutoHotkey64.exe",
    "%ProgramFiles%\\AutoHotkey\\v2\\AutoHotkey.exe",
    "%ProgramFiles(x86)%\\AutoHotkey\\v2\\AutoHotkey.exe",
    "%LOCALAPPDATA%\\Programs\\AutoHotkey\\v2\\AutoHotkey.exe",
];

/// 宿主配置。
///
/// 字段说明：
/// - `project_root`：显式指定项目根（优先于自动探测）
/// - `marker_dir`：探测项目根时使用的标记子目录
/// - `backups_dir`：备份目录（相对项目根）
/// - `optimization_config`：优化开关清单文件（相对项目根）
/// - `settings_paths_file`：工具路径持久化文件（相对项目根）
/// - `log_settle_ms`：日志监视在收到变更通知后的等待时间
/// - `interpreters`：进程运行器使用的外部程序
/// - `autohotkey_candidates`：AutoHotkey 解释器搜索顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub project_root: Option<PathBuf>,
    pub marker_dir: String,
    pub backups_dir: String,
    pub optimization_config: String,
    pub settings_paths_file: String,
    pub log_settle_ms: u64,
    pub interpreters: Interpreters,
    pub autohotkey_candidates: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            marker_dir: DEFAULT_MARKER_DIR.to_string(),
            backups_dir: "Backups".to_string(),
            optimization_config: "5-Optimization/5.0-optimization-settings.txt".to_string(),
            settings_paths_file: "dcs-max-paths.json".to_string(),
            log_settle_ms: 100,
            interpreters: Interpreters::default(),
            autohotkey_candidates: DEFAULT_AUTOHOTKEY_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// 外部解释器/工具可执行文件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interpreters {
    pub powershell: String,
    pub cmd: String,
    pub reg: String,
    pub regedit: String,
}

impl Default for Interpreters {
    fn default() -> Self {
        Self {
            powershell: "powershell.exe".to_string(),
            cmd: "cmd.exe".to_string(),
            reg: "reg.exe".to_string(),
            regedit: "regedit.exe".to_string(),
        }
    }
}

impl HostConfig {
    /// 从 JSON 文件加载配置。
    ///
    /// 异常处理：
    /// - 文件读取失败或 JSON 格式错误时返回错误
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("读取宿主配置失败: {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("解析宿主配置失败: {}", path.display()))?;
        Ok(cfg)
    }

    /// 加载配置：显式路径必须存在；否则尝试 exe 同目录下的默认文件。
    ///
    /// 返回值：
    /// - `(配置, 实际加载的文件)`；未找到默认文件时为 `(默认配置, None)`
    pub fn load_or_default(explicit: Option<&Path>, exe_dir: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        if let Some(dir) = exe_dir {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok((Self::load(&candidate)?, Some(candidate)));
            }
        }
        Ok((Self::default(), None))
    }

    pub fn log_settle(&self) -> Duration {
        Duration::from_millis(self.log_settle_ms)
    }
}
