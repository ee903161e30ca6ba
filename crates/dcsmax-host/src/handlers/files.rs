//! 文件类方法：备份列表、日志读取、目录列表、外部打开、文件/目录选择。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use dcsmax_core::reply::{MethodResult, Payload};
use dcsmax_core::{backups, paths, store};
use dcsmax_windows::{dialog, shell};
use tracing::{info, warn};

use super::{os_failure, store_failure};
use crate::args::{Args, DispatchError};
use crate::context::HostContext;

pub fn list_backups(ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    Ok(match backups::list_backups(&ctx.backups_dir()) {
        Ok(entries) => MethodResult::success(Payload::new().with("backups", entries)),
        Err(e) => store_failure(e),
    })
}

/// 读取日志；日志目录尚不存在时先创建，便于脚本随后写入。
pub fn read_log(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let path = ctx.resolve(&args.string(0, "path")?);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty() && !d.exists()) {
        if let Err(e) = paths::ensure_dir(dir) {
            warn!(dir = %dir.display(), error = %e, "创建日志目录失败");
        }
    }
    Ok(match store::read_text(&path) {
        Ok(content) => MethodResult::success(Payload::new().with("content", content)),
        Err(e) => store_failure(e),
    })
}

pub fn list_directory(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let dir = ctx.resolve(&args.string(0, "path")?);
    Ok(match store::list_directory(&dir) {
        Ok(listing) => MethodResult::success(
            Payload::new()
                .with("files", listing.files)
                .with("directories", listing.directories),
        ),
        Err(e) => store_failure(e),
    })
}

/// 用系统默认程序打开项目内的文件。
pub fn open_file(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let path = ctx.resolve(&args.string(0, "path")?);
    if !path.exists() {
        return Ok(MethodResult::failure(format!("File not found: {}", path.display())));
    }
    info!(path = %path.display(), "打开文件");
    Ok(match shell::open_path(&path.to_string_lossy()) {
        Ok(()) => MethodResult::ok(),
        Err(e) => os_failure(e),
    })
}

pub fn open_external(args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let url = args.string(0, "url")?;
    info!(url = %url, "打开外部链接");
    Ok(match shell::open_path(&url) {
        Ok(()) => MethodResult::ok(),
        Err(e) => os_failure(e),
    })
}

fn picked(result: anyhow::Result<Option<String>>) -> MethodResult {
    match result {
        Ok(Some(path)) => MethodResult::success(Payload::new().with("path", path)),
        Ok(None) => MethodResult::cancelled(),
        Err(e) => os_failure(e),
    }
}

pub fn browse_for_file(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let title = args.opt_string(0, "title")?;
    let filter = args.opt_string(1, "filter")?;
    Ok(picked(dialog::browse_for_file(
        &ctx.config.interpreters.powershell,
        title.as_deref(),
        filter.as_deref(),
    )))
}

pub fn browse_for_folder(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let title = args.opt_string(0, "title")?;
    Ok(picked(dialog::browse_for_folder(
        &ctx.config.interpreters.powershell,
        title.as_deref(),
    )))
}

pub fn project_root(ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    Ok(MethodResult::success(
        Payload::new().with("path", ctx.project_root.to_string_lossy()),
    ))
}
