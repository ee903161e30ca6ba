//! 项目根目录探测与路径约定。
//!
//! 目标：
//! - 宿主 exe 位于 `<根>/bin/...` 或更深层的发布目录中，需要向上探测项目根
//! - UI 传入的配置/脚本/备份路径均相对于项目根解释，绝对路径原样使用
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// 默认的根目录标记子目录。
pub const DEFAULT_MARKER_DIR: &str = "Backups";

/// 向上探测的层数（`..`、`../..`、`../../..`）。
const PROBE_DEPTHS: usize = 3;

/// 由安装目录探测项目根。
///
/// 参数：
/// - `install_dir`：宿主可执行文件所在目录
/// - `marker`：根目录下必然存在的子目录名（默认 `Backups`）
///
/// 返回值：
/// - 第一个包含 `marker` 子目录的祖先目录
/// - 都不匹配时返回最浅的候选（`install_dir/..`），不会失败
pub fn resolve_project_root(install_dir: &Path, marker: &str) -> PathBuf {
    let mut candidate = install_dir.to_path_buf();
    let mut shallowest = None;
    for _ in 0..PROBE_DEPTHS {
        candidate = candidate.join("..");
        let normalized = normalize(&candidate);
        if normalized.join(marker).is_dir() {
            return normalized;
        }
        shallowest.get_or_insert(normalized);
    }
    shallowest.unwrap_or_else(|| install_dir.to_path_buf())
}

/// 词法规范化（折叠 `.` 与 `..`），不访问文件系统。
///
/// 说明：
/// - 不使用 `canonicalize`，避免 Windows 上产生 `\\?\` 前缀传给脚本
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// 将 UI 传入的路径解析到项目根下。
///
/// 返回值：
/// - `raw` 为绝对路径：原样返回
/// - 否则：`root.join(raw)`（统一斜杠方向后）
pub fn resolve_under_root(root: &Path, raw: &str) -> PathBuf {
    let cleaned = if cfg!(windows) {
        raw.replace('/', "\\")
    } else {
        raw.to_string()
    };
    let p = PathBuf::from(cleaned);
    if p.is_absolute() {
        p
    } else {
        root.join(p)
    }
}

/// 展开 Windows 风格的 `%VAR%` 环境变量引用。
///
/// 说明：
/// - 未定义的变量保持原样（包括两侧的 `%`）
/// - 不成对的 `%` 原样保留
pub fn expand_env_vars(raw: &str) -> String {
    expand_with(raw, |name| std::env::var(name).ok())
}

/// 以给定查找函数展开 `%VAR%`（便于测试）。
pub fn expand_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// 获取当前可执行文件所在目录。
///
/// 异常处理：
/// - 无法读取当前 exe 路径或其没有父目录时返回错误
pub fn current_exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("读取当前可执行文件路径失败")?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("可执行文件没有父目录: {}", exe.display()))
}

/// 确保目录存在（不存在则递归创建）。
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).with_context(|| format!("创建目录失败: {}", path.display()))?;
    Ok(())
}
