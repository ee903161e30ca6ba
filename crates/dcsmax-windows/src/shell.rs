//! 使用系统默认程序打开文件/URL。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use anyhow::Result;

/// 打开文件、目录或 URL（等价于资源管理器中双击）。
///
/// 异常处理：
/// - Windows：`ShellExecuteW` 返回值 <= 32 视为失败
/// - 其它平台：`xdg-open`/`open` 无法启动时返回错误
#[cfg(windows)]
pub fn open_path(target: &str) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;

    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Shell::ShellExecuteW;
    use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    let wide = |s: &str| -> Vec<u16> { OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect() };
    let op = wide("open");
    let file = wide(target);
    let code = unsafe {
        ShellExecuteW(
            HWND::default(),
            PCWSTR(op.as_ptr()),
            PCWSTR(file.as_ptr()),
            PCWSTR::null(),
            PCWSTR::null(),
            SW_SHOWNORMAL,
        )
    };
    let code = code.0 as isize;
    if code <= 32 {
        return Err(anyhow::anyhow!("ShellExecute failed ({code}) for {target}"));
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn open_path(target: &str) -> Result<()> {
    use anyhow::Context;

    let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    std::process::Command::new(opener)
        .arg(target)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("启动 {opener} 失败"))?;
    Ok(())
}
