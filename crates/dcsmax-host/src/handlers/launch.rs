//! 启动类方法：工具路径探测、VR 客户端、带任务启动 DCS、任务重开热键。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::PathBuf;

use dcsmax_core::reply::{MethodResult, Payload};
use dcsmax_windows::probe::{self, SystemHost, VrPlatform};
use dcsmax_windows::{input, process};
use tracing::info;

use super::os_failure;
use crate::args::{Args, DispatchError};
use crate::context::HostContext;

/// DCS 主进程名。
pub const DCS_PROCESS: &str = "DCS.exe";

pub fn detect_paths() -> Result<MethodResult, DispatchError> {
    Ok(MethodResult::success(
        Payload::new().with("paths", probe::detect_all(&SystemHost)),
    ))
}

/// 启动 VR 客户端；已在运行时直接返回 `alreadyRunning: true`。
///
/// 参数：
/// - `hardware`：头显品牌（缺省 Pimax）
/// - `exePath`：客户端可执行文件（为空时使用探测到的默认位置）
pub fn launch_vr_software(args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let hardware = args
        .opt_string(0, "hardware")?
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "Pimax".to_string());
    let platform = VrPlatform::from_hardware(&hardware);
    if process::is_any_running(platform.client_processes()) {
        info!(hardware = %hardware, "VR 客户端已在运行");
        return Ok(MethodResult::success(Payload::new().with("alreadyRunning", true)));
    }
    let exe = args
        .opt_string(1, "exePath")?
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| platform.default_client(&SystemHost));
    Ok(match process::launch_detached(&PathBuf::from(&exe), &[]) {
        Ok(pid) => {
            info!(hardware = %hardware, pid, "VR 客户端已启动");
            MethodResult::success(Payload::new().with("alreadyRunning", false))
        }
        Err(e) => os_failure(e),
    })
}

pub fn launch_dcs_with_mission(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let dcs = args.string(0, "dcsExePath")?;
    let mission = ctx.resolve(&args.string(1, "missionPath")?);
    if process::is_any_running(&[DCS_PROCESS]) {
        info!("DCS 已在运行，跳过启动");
        return Ok(MethodResult::success(Payload::new().with("alreadyRunning", true)));
    }
    let launch_args = vec!["--mission".to_string(), mission.to_string_lossy().into_owned()];
    Ok(match process::launch_detached(&PathBuf::from(&dcs), &launch_args) {
        Ok(pid) => {
            info!(pid, mission = %mission.display(), "DCS 已带任务启动");
            MethodResult::success(Payload::new().with("alreadyRunning", false))
        }
        Err(e) => os_failure(e),
    })
}

/// 切到 DCS 窗口并发送 Shift+R（重新开始任务）。
pub fn send_mission_restart() -> Result<MethodResult, DispatchError> {
    let Some(pid) = process::find_process_ids(DCS_PROCESS).into_iter().next() else {
        return Ok(MethodResult::failure("DCS is not running"));
    };
    Ok(match input::send_mission_restart(pid) {
        Ok(()) => MethodResult::ok(),
        Err(e) => os_failure(e),
    })
}
