//! 系统类方法：脚本/命令同步执行、系统信息、服务列表、还原点、注册表导入、管理员检查。
//!
//! 说明：
//! - 系统信息与服务列表通过 PowerShell 查询，输出为 JSON
//! - 解析失败时按“未知”降级，不视为错误
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use dcsmax_core::reply::{MethodResult, Payload};
use dcsmax_windows::dialog::ps_quote;
use dcsmax_windows::elevation;
use serde_json::{json, Value};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::os_failure;
use crate::args::{Args, DispatchError};
use crate::context::HostContext;
use crate::runner::{self, Captured};

/// 查询 OS / 内存 / CPU / 显卡 / DCS 存档目录，输出单行 JSON。
const SYSTEM_INFO_SCRIPT: &str = "$ErrorActionPreference='SilentlyContinue'; \
$os=(Get-CimInstance Win32_OperatingSystem).Caption; \
$ram=[math]::Round((Get-CimInstance Win32_ComputerSystem).TotalPhysicalMemory/1GB); \
$cpu=(Get-CimInstance Win32_Processor | Select-Object -First 1).Name; \
$gpus=Get-CimInstance Win32_VideoController; \
$gpu=($gpus | Where-Object { $_.Name -notmatch 'Microsoft|Basic' } | Select-Object -First 1).Name; \
if (-not $gpu) { $gpu=($gpus | Select-Object -First 1).Name }; \
$dcs=Join-Path $env:USERPROFILE 'Saved Games\\DCS'; \
@{OS=$os; RAM=$ram; CPU=$cpu; GPU=$gpu; DCSPath=$dcs} | ConvertTo-Json -Compress";

const SERVICES_SCRIPT: &str = "Get-Service | Select-Object Name, DisplayName, Status, StartType | ConvertTo-Json";

const RESTORE_POINT_LIMITED: &str = "Windows limits restore point creation to once per 24 hours.";

/// PowerShell `-File` 同步执行脚本。
pub fn execute_script(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let script = ctx.resolve(&args.string(0, "path")?);
    let script_args = args.string_list(1, "args")?;
    let launch = runner::powershell_file(&ctx.config.interpreters, &script, &script_args);
    info!(script = %script.display(), "同步执行脚本");
    Ok(match runner::run_captured(&launch) {
        Ok(c) => MethodResult::from_exit(
            c.success(),
            Payload::new()
                .with("code", c.code)
                .with("stdout", c.stdout)
                .with("stderr", c.stderr),
        ),
        Err(e) => {
            warn!(script = %script.display(), error = %e, "启动脚本失败");
            MethodResult::failure_with(
                e.to_string(),
                Payload::new().with("stdout", "").with("stderr", ""),
            )
        }
    })
}

pub fn execute_command(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let command = args.string(0, "command")?;
    let captured = match runner::run_powershell(&ctx.config.interpreters, &command) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "启动 PowerShell 失败");
            Captured {
                code: -1,
                stdout: String::new(),
                stderr: e.to_string(),
            }
        }
    };
    Ok(MethodResult::from_exit(
        captured.success(),
        Payload::new()
            .with("exitCode", captured.code)
            .with("stdout", captured.stdout)
            .with("stderr", captured.stderr),
    ))
}

pub fn system_info(ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    Ok(match runner::run_powershell(&ctx.config.interpreters, SYSTEM_INFO_SCRIPT) {
        Ok(c) => MethodResult::success(Payload::new().with("info", parse_system_info(&c.stdout))),
        Err(e) => os_failure(e),
    })
}

/// 解析系统信息输出；无法解析时返回全部“未知”的占位对象。
pub fn parse_system_info(stdout: &str) -> Value {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(v @ Value::Object(_)) => v,
        _ => json!({
            "OS": "Unknown",
            "RAM": 0,
            "CPU": "Unknown",
            "GPU": "Unknown",
            "DCSPath": "",
        }),
    }
}

pub fn is_admin() -> Result<MethodResult, DispatchError> {
    Ok(match elevation::is_running_as_admin() {
        Ok(admin) => MethodResult::success(Payload::new().with("isAdmin", admin)),
        Err(e) => {
            warn!(error = %e, "管理员检查失败");
            MethodResult::from_exit(false, Payload::new().with("isAdmin", false))
        }
    })
}

pub fn services(ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    Ok(match runner::run_powershell(&ctx.config.interpreters, SERVICES_SCRIPT) {
        Ok(c) => MethodResult::success(Payload::new().with("services", parse_services(&c.stdout))),
        Err(e) => os_failure(e),
    })
}

/// `ConvertTo-Json` 对单个对象不输出数组，这里统一成列表。
pub fn parse_services(stdout: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(stdout.trim()) {
        Ok(Value::Array(items)) => items,
        Ok(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

/// 默认还原点名称：`DCS-Max_Backup_yyyy-MM-dd-HH-mm-ss`（本地时间）。
pub fn restore_point_name(at: OffsetDateTime) -> Result<String, time::error::Format> {
    let stamp = at.format(format_description!(
        "[year]-[month]-[day]-[hour]-[minute]-[second]"
    ))?;
    Ok(format!("DCS-Max_Backup_{stamp}"))
}

/// 把 `Checkpoint-Computer` 的错误输出转换为用户可读的消息。
pub fn map_restore_point_error(stderr: &str) -> String {
    if stderr.contains("1058") || stderr.contains("frequency") {
        RESTORE_POINT_LIMITED.to_string()
    } else {
        stderr.trim().to_string()
    }
}

pub fn create_restore_point(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let name = match args.opt_string(0, "name")?.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            restore_point_name(now).map_err(anyhow::Error::new)?
        }
    };
    let command = format!(
        "Checkpoint-Computer -Description {} -RestorePointType 'MODIFY_SETTINGS'",
        ps_quote(&name)
    );
    info!(name = %name, "创建系统还原点");
    Ok(match runner::run_powershell(&ctx.config.interpreters, &command) {
        Ok(c) if c.success() => MethodResult::success(Payload::new().with("name", name)),
        Ok(c) => {
            warn!(code = c.code, "创建还原点失败");
            MethodResult::failure(map_restore_point_error(&c.stderr))
        }
        Err(e) => os_failure(e),
    })
}

/// 以管理员身份静默导入备份目录中的 `.reg` 文件。
pub fn import_registry(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let name = args.string(0, "regFileName")?;
    let file = ctx.backups_dir().join(&name);
    if !file.is_file() {
        return Ok(MethodResult::failure(format!(
            "Registry file not found: {}",
            file.display()
        )));
    }
    let file_text = file.to_string_lossy().into_owned();
    let command = format!(
        "$p = Start-Process -FilePath {} -ArgumentList '/s', {} -Verb RunAs -Wait -PassThru; exit $p.ExitCode",
        ps_quote(&ctx.config.interpreters.regedit),
        ps_quote(&format!("\"{file_text}\"")),
    );
    info!(file = %file.display(), "导入注册表备份");
    Ok(match runner::run_powershell(&ctx.config.interpreters, &command) {
        Ok(c) => MethodResult::from_exit(c.success(), Payload::new().with("file", file_text)),
        Err(e) => os_failure(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcsmax_core::config::HostConfig;
    use time::macros::datetime;

    #[test]
    fn system_info_falls_back_to_unknown() {
        let v = parse_system_info("garbage");
        assert_eq!(v["OS"], "Unknown");
        assert_eq!(v["RAM"], 0);
        assert_eq!(v["DCSPath"], "");

        let v = parse_system_info(r#"{"OS":"Windows 11 Pro","RAM":32,"CPU":"x","GPU":"y","DCSPath":"C:\\Saved Games\\DCS"}"#);
        assert_eq!(v["RAM"], 32);
    }

    #[test]
    fn services_are_always_a_list() {
        assert_eq!(parse_services(r#"{"Name":"a"}"#).len(), 1);
        assert_eq!(parse_services(r#"[{"Name":"a"},{"Name":"b"}]"#).len(), 2);
        assert!(parse_services("").is_empty());
    }

    #[test]
    fn restore_point_defaults_and_errors() {
        let name = restore_point_name(datetime!(2026-03-04 05:06:07 UTC)).unwrap();
        assert_eq!(name, "DCS-Max_Backup_2026-03-04-05-06-07");
        assert_eq!(
            map_restore_point_error("Checkpoint-Computer : error 0x80042306 (1058)"),
            RESTORE_POINT_LIMITED
        );
        assert_eq!(map_restore_point_error("  denied \r\n"), "denied");
    }

    #[test]
    fn import_of_missing_file_names_the_backup_path() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = HostContext::new(HostConfig::default(), tmp.path().to_path_buf());
        let raw = vec![serde_json::json!("nope-registry-backup.reg")];
        let v = import_registry(&ctx, Args::new(&raw)).unwrap().to_value();
        let msg = v["error"].as_str().unwrap();
        assert!(msg.starts_with("Registry file not found: "));
        assert!(msg.ends_with("nope-registry-backup.reg"));
    }

    #[cfg(unix)]
    #[test]
    fn command_spawn_failure_reports_exit_code() {
        let mut config = HostConfig::default();
        config.interpreters.powershell = "dcsmax-no-such-shell".to_string();
        let ctx = HostContext::new(config, std::path::PathBuf::from("."));
        let raw = vec![serde_json::json!("Get-Date")];
        let v = execute_command(&ctx, Args::new(&raw)).unwrap().to_value();
        assert_eq!(v["success"], false);
        assert_eq!(v["exitCode"], -1);
        assert_eq!(v["stdout"], "");
        assert!(!v["stderr"].as_str().unwrap().is_empty());
    }
}
