//! 提权/权限相关检测。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use anyhow::Result;

/// 判断当前进程是否以管理员权限运行。
///
/// 返回值：
/// - `Ok(true)`：当前为管理员
/// - `Ok(false)`：当前非管理员
///
/// 异常处理：
/// - Windows 上该 API 不返回错误码；非 Windows 平台返回错误
#[cfg(windows)]
pub fn is_running_as_admin() -> Result<bool> {
    use windows::Win32::UI::Shell::IsUserAnAdmin;
    unsafe { Ok(IsUserAnAdmin().as_bool()) }
}

#[cfg(not(windows))]
pub fn is_running_as_admin() -> Result<bool> {
    Err(anyhow::anyhow!("Administrator check is only available on Windows"))
}
