//! 向 DCS 窗口注入按键（任务重开：Shift+R）。
//!
//! 实现方式：
//! - `EnumWindows` + `GetWindowThreadProcessId` 找到目标进程的可见顶层窗口
//! - `SetForegroundWindow` 激活后用 `SendInput` 发送扫描码（DirectInput 只识别扫描码）
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use anyhow::Result;

/// 左 Shift 扫描码。
pub const SCAN_LSHIFT: u16 = 0x2A;
/// `R` 扫描码。
pub const SCAN_R: u16 = 0x13;

/// 激活 `pid` 的主窗口并发送 Shift+R。
///
/// 异常处理：
/// - 找不到可见窗口或 `SendInput` 未全部注入时返回错误
/// - 非 Windows 平台始终返回错误
#[cfg(windows)]
pub fn send_mission_restart(pid: u32) -> Result<()> {
    use std::time::Duration;

    use anyhow::anyhow;
    use tracing::info;

    let hwnd = imp::find_main_window(pid).ok_or_else(|| anyhow!("DCS window not found"))?;
    imp::activate(hwnd);
    std::thread::sleep(Duration::from_millis(150));

    imp::send_scancodes(&[SCAN_LSHIFT, SCAN_R], false)?;
    std::thread::sleep(Duration::from_millis(50));
    imp::send_scancodes(&[SCAN_R, SCAN_LSHIFT], true)?;
    info!(pid, "已向 DCS 发送 Shift+R");
    Ok(())
}

#[cfg(not(windows))]
pub fn send_mission_restart(_pid: u32) -> Result<()> {
    Err(anyhow::anyhow!("Key injection is only supported on Windows"))
}

#[cfg(windows)]
mod imp {
    use anyhow::{anyhow, Result};
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
        KEYEVENTF_SCANCODE, VIRTUAL_KEY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowThreadProcessId, IsIconic, IsWindowVisible, SetForegroundWindow,
        ShowWindow, SW_RESTORE,
    };

    struct Search {
        pid: u32,
        found: Option<HWND>,
    }

    unsafe extern "system" fn visit(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let search = &mut *(lparam.0 as *mut Search);
        let mut owner = 0u32;
        GetWindowThreadProcessId(hwnd, Some(&mut owner as *mut u32));
        if owner == search.pid && IsWindowVisible(hwnd).as_bool() {
            search.found = Some(hwnd);
            return BOOL(0);
        }
        BOOL(1)
    }

    pub fn find_main_window(pid: u32) -> Option<HWND> {
        let mut search = Search { pid, found: None };
        // 回调返回 FALSE 提前结束枚举时 EnumWindows 也会报错，结果以 found 为准。
        unsafe {
            let _ = EnumWindows(Some(visit), LPARAM(&mut search as *mut Search as isize));
        }
        search.found
    }

    pub fn activate(hwnd: HWND) {
        unsafe {
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            let _ = SetForegroundWindow(hwnd);
        }
    }

    pub fn send_scancodes(codes: &[u16], key_up: bool) -> Result<()> {
        let mut flags: KEYBD_EVENT_FLAGS = KEYEVENTF_SCANCODE;
        if key_up {
            flags = flags | KEYEVENTF_KEYUP;
        }
        let inputs: Vec<INPUT> = codes
            .iter()
            .map(|&scan| INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VIRTUAL_KEY(0),
                        wScan: scan,
                        dwFlags: flags,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            })
            .collect();
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(anyhow!("SendInput injected {sent} of {} events", inputs.len()));
        }
        Ok(())
    }
}
