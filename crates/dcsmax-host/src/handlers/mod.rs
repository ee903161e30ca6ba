//! 方法处理器（请求/响应型方法）。
//!
//! 说明：
//! - 所有处理器都是阻塞函数，由桥接层放到阻塞线程池执行
//! - 可预期的失败（文件缺失、进程非零退出等）以 `MethodResult::Failure` 返回
//! - 参数错误与意外错误以 [`DispatchError`] 返回，由桥接层统一转换
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use anyhow::anyhow;
use dcsmax_core::error::StoreError;
use dcsmax_core::ipc::Method;
use dcsmax_core::reply::MethodResult;
use serde_json::Value;
use tracing::warn;

use crate::args::{Args, DispatchError};
use crate::context::HostContext;

pub mod config;
pub mod files;
pub mod launch;
pub mod system;

/// 分发一个请求/响应型方法。
///
/// 参数：
/// - `method`：已识别的方法
/// - `args`：位置参数
/// - `ctx`：宿主上下文
///
/// 异常处理：
/// - 会话型方法（流式脚本、日志监视）不在此处理，传入时返回错误
pub fn dispatch(method: Method, args: &[Value], ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    let args = Args::new(args);
    match method {
        Method::ReadIniConfig => config::read_ini(ctx, args),
        Method::WriteIniConfig => config::write_ini(ctx, args),
        Method::ReadJsonConfig => config::read_json(ctx, args),
        Method::WriteJsonConfig => config::write_json(ctx, args),
        Method::ReadOptimizationConfig => config::read_optimization(ctx),
        Method::WriteOptimizationConfig => config::write_optimization(ctx, args),
        Method::GetOptimizationConfigPath => config::optimization_path(ctx),
        Method::ReadSettingsPaths => config::read_settings_paths(ctx),
        Method::WriteSettingsPaths => config::write_settings_paths(ctx, args),
        Method::ReadOptionsLua => config::read_options_lua(ctx, args),

        Method::ExecuteScript => system::execute_script(ctx, args),
        Method::ExecuteCommand => system::execute_command(ctx, args),
        Method::GetSystemInfo => system::system_info(ctx),
        Method::IsAdmin => system::is_admin(),
        Method::GetServices => system::services(ctx),
        Method::CreateRestorePoint => system::create_restore_point(ctx, args),
        Method::ImportRegistry => system::import_registry(ctx, args),

        Method::ListBackups => files::list_backups(ctx),
        Method::ReadLog => files::read_log(ctx, args),
        Method::ListDirectory => files::list_directory(ctx, args),
        Method::OpenFile => files::open_file(ctx, args),
        Method::OpenExternal => files::open_external(args),
        Method::BrowseForFile => files::browse_for_file(ctx, args),
        Method::BrowseForFolder => files::browse_for_folder(ctx, args),
        Method::GetProjectRoot => files::project_root(ctx),

        Method::DetectPaths => launch::detect_paths(),
        Method::LaunchVrSoftware => launch::launch_vr_software(args),
        Method::LaunchDcsWithMission => launch::launch_dcs_with_mission(ctx, args),
        Method::SendMissionRestart => launch::send_mission_restart(),

        Method::ExecuteScriptStream | Method::StopScript | Method::WatchLog | Method::StopWatchLog => {
            Err(anyhow!("{} is a session method", method.name()).into())
        }
    }
}

/// 存储层错误 → 失败结果（消息即线上文本）。
pub(crate) fn store_failure(e: StoreError) -> MethodResult {
    warn!(error = %e, "存储操作失败");
    MethodResult::failure(e.to_string())
}

/// 系统调用错误 → 失败结果。
///
/// 日志保留完整上下文链；线上只返回最底层的系统消息。
pub(crate) fn os_failure(e: anyhow::Error) -> MethodResult {
    warn!(error = %format!("{e:#}"), "系统操作失败");
    MethodResult::failure(e.root_cause().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use dcsmax_core::config::HostConfig;

    #[test]
    fn session_methods_are_rejected_here() {
        let ctx = HostContext::new(HostConfig::default(), PathBuf::from("."));
        for m in Method::all().filter(|m| m.is_fire_and_forget()) {
            assert!(dispatch(m, &[], &ctx).is_err(), "{}", m.name());
        }
    }

    #[test]
    fn os_failure_reports_root_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access is denied.");
        let e = anyhow::Error::new(io).context("启动程序失败");
        let v = os_failure(e).to_value();
        assert_eq!(v["error"], "Access is denied.");
        assert_eq!(v["success"], false);
    }
}
