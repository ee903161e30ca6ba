//! 进程检测与分离式启动（VR 客户端、DCS 本体）。
//!
//! 实现策略：
//! - 按可执行文件名匹配（忽略路径与大小写）
//! - 分离式启动不等待子进程，也不接管其输出
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tracing::info;

/// `CREATE_NO_WINDOW`：子进程不创建控制台窗口。
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[cfg_attr(not(windows), allow(dead_code))]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg_attr(not(windows), allow(dead_code))]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

fn snapshot() -> System {
    let mut system = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
    );
    system.refresh_processes();
    system
}

/// 查找指定进程名对应的全部 PID。
///
/// 参数：
/// - `name`：进程映像名（例如 `DCS.exe`）；比较时忽略大小写
pub fn find_process_ids(name: &str) -> Vec<u32> {
    let needle = name.to_ascii_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let system = snapshot();
    let mut pids: Vec<u32> = system
        .processes()
        .iter()
        .filter(|(_, p)| p.name().to_ascii_lowercase() == needle)
        .map(|(pid, _)| pid.as_u32())
        .collect();
    pids.sort_unstable();
    pids
}

/// 任意一个进程名正在运行即返回 `true`。
pub fn is_any_running(names: &[&str]) -> bool {
    if names.is_empty() {
        return false;
    }
    let wanted: Vec<String> = names.iter().map(|n| n.to_ascii_lowercase()).collect();
    let system = snapshot();
    system
        .processes()
        .values()
        .any(|p| wanted.contains(&p.name().to_ascii_lowercase()))
}

/// 判断指定可执行文件对应的进程是否正在运行（只比较文件名）。
pub fn is_process_running_by_exe(exe_path: &Path) -> bool {
    let name = exe_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    !find_process_ids(name).is_empty()
}

/// 以分离方式启动程序（不等待、不重定向输出）。
///
/// 参数：
/// - `exe`：可执行文件路径；工作目录为其所在目录
/// - `args`：启动参数
///
/// 返回值：
/// - 新进程 PID
///
/// 异常处理：
/// - 文件不存在或启动失败时返回错误
pub fn launch_detached(exe: &Path, args: &[String]) -> Result<u32> {
    if !exe.is_file() {
        return Err(anyhow!("Executable not found: {}", exe.display()));
    }
    let mut cmd = Command::new(exe);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = exe.parent().filter(|d| !d.as_os_str().is_empty()) {
        cmd.current_dir(dir);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("启动程序失败: {}", exe.display()))?;
    let pid = child.id();
    info!(exe = %exe.display(), pid, "已启动外部程序");
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_never_match() {
        assert!(find_process_ids("").is_empty());
        assert!(!is_any_running(&[]));
        assert!(!is_process_running_by_exe(Path::new("")));
    }

    #[test]
    fn unknown_process_is_not_running() {
        let name = format!("dcsmax-nope-{}.exe", uuid::Uuid::new_v4());
        assert!(!is_any_running(&[name.as_str()]));
    }

    #[test]
    fn launching_missing_exe_fails() {
        let err = launch_detached(Path::new("/definitely/not/here.exe"), &[]).unwrap_err();
        assert!(err.to_string().starts_with("Executable not found"));
    }
}
