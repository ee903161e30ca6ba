//! 原生文件/目录选择对话框。
//!
//! 实现方式：
//! - 通过 `powershell -STA` 调用 WinForms `OpenFileDialog` / `FolderBrowserDialog`
//! - 对话框挂在一个置顶的隐藏窗体上，避免被宿主窗口遮挡
//! - 选中结果以 UTF-8 写到 stdout；取消时输出为空
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

pub const DEFAULT_FILE_TITLE: &str = "Select File";
pub const DEFAULT_FILE_FILTER: &str = "All Files (*.*)|*.*";
pub const DEFAULT_FOLDER_TITLE: &str = "Select Folder";

/// 将任意文本转为 PowerShell 单引号字面量。
pub fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

const PROLOGUE: &str = "Add-Type -AssemblyName System.Windows.Forms; \
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8; \
$owner = New-Object System.Windows.Forms.Form -Property @{TopMost=$true; ShowInTaskbar=$false}; ";

/// 生成文件选择对话框脚本。
pub fn file_dialog_script(title: &str, filter: &str) -> String {
    format!(
        "{PROLOGUE}$d = New-Object System.Windows.Forms.OpenFileDialog; \
$d.Title = {}; $d.Filter = {}; $d.CheckFileExists = $true; \
if ($d.ShowDialog($owner) -eq [System.Windows.Forms.DialogResult]::OK) {{ [Console]::Out.Write($d.FileName) }}; \
$owner.Dispose()",
        ps_quote(title),
        ps_quote(filter)
    )
}

/// 生成目录选择对话框脚本。
pub fn folder_dialog_script(title: &str) -> String {
    format!(
        "{PROLOGUE}$d = New-Object System.Windows.Forms.FolderBrowserDialog; \
$d.Description = {}; $d.ShowNewFolderButton = $true; \
if ($d.ShowDialog($owner) -eq [System.Windows.Forms.DialogResult]::OK) {{ [Console]::Out.Write($d.SelectedPath) }}; \
$owner.Dispose()",
        ps_quote(title)
    )
}

/// 弹出文件选择对话框（阻塞直到用户关闭）。
///
/// 参数：
/// - `powershell`：PowerShell 可执行文件
/// - `title` / `filter`：为空时使用默认值
///
/// 返回值：
/// - `Ok(Some(path))`：用户选择了文件
/// - `Ok(None)`：用户取消
pub fn browse_for_file(powershell: &str, title: Option<&str>, filter: Option<&str>) -> Result<Option<String>> {
    let title = title.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_FILE_TITLE);
    let filter = filter.filter(|f| !f.is_empty()).unwrap_or(DEFAULT_FILE_FILTER);
    run_dialog(powershell, &file_dialog_script(title, filter))
}

/// 弹出目录选择对话框（阻塞直到用户关闭）。
pub fn browse_for_folder(powershell: &str, title: Option<&str>) -> Result<Option<String>> {
    let title = title.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_FOLDER_TITLE);
    run_dialog(powershell, &folder_dialog_script(title))
}

fn run_dialog(powershell: &str, script: &str) -> Result<Option<String>> {
    if !cfg!(windows) {
        return Err(anyhow!("Native dialogs are only available on Windows"));
    }
    let mut cmd = Command::new(powershell);
    cmd.args(["-NoProfile", "-STA", "-ExecutionPolicy", "Bypass", "-Command", script])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(crate::process::CREATE_NO_WINDOW);
    }
    let out = cmd.output().context("启动对话框进程失败")?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(anyhow!("Dialog failed: {}", stderr.trim()));
    }
    let selected = String::from_utf8_lossy(&out.stdout).trim().to_string();
    debug!(cancelled = selected.is_empty(), "对话框已关闭");
    Ok((!selected.is_empty()).then_some(selected))
}
