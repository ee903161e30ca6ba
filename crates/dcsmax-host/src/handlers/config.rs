//! 配置读写：INI、JSON、优化开关文件、工具路径、`options.lua`。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::collections::BTreeMap;

use dcsmax_core::reply::{MethodResult, Payload};
use dcsmax_core::{ini, options_lua, paths, settings, store, toggles};
use dcsmax_windows::probe::{self, SystemHost};
use serde_json::Value;
use tracing::info;

use super::store_failure;
use crate::args::{Args, DispatchError};
use crate::context::HostContext;

/// 游戏默认的 `options.lua` 位置。
pub const DEFAULT_OPTIONS_LUA: &str = "%USERPROFILE%\\Saved Games\\DCS\\Config\\options.lua";

pub fn read_ini(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let path = ctx.resolve(&args.string(0, "path")?);
    Ok(match store::read_text(&path) {
        Ok(content) => {
            let parsed = ini::parse_ini(&content);
            MethodResult::success(Payload::new().with("content", &content).with("parsed", parsed))
        }
        Err(e) => store_failure(e),
    })
}

pub fn write_ini(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let path = ctx.resolve(&args.string(0, "path")?);
    let content = args.string(1, "content")?;
    Ok(match store::write_text(&path, &content) {
        Ok(()) => MethodResult::ok(),
        Err(e) => store_failure(e),
    })
}

pub fn read_json(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let path = ctx.resolve(&args.string(0, "path")?);
    Ok(match store::read_json(&path) {
        Ok((content, data)) => MethodResult::success(Payload::new().with("content", content).with("data", data)),
        Err(e) => store_failure(e),
    })
}

/// `jsonContent` 可以是 JSON 文本，也可以是已解析的值；统一格式化后写入。
pub fn write_json(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let path = ctx.resolve(&args.string(0, "path")?);
    let value = match args.value(1, "jsonContent")? {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(v) => v,
            Err(e) => return Ok(MethodResult::failure(e.to_string())),
        },
        other => other.clone(),
    };
    Ok(match store::write_json_pretty(&path, &value) {
        Ok(()) => MethodResult::ok(),
        Err(e) => store_failure(e),
    })
}

pub fn read_optimization(ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    let path = ctx.optimization_config_path();
    if !path.is_file() {
        return Ok(MethodResult::success(
            Payload::new().with("exists", false).with("config", serde_json::Map::new()),
        ));
    }
    Ok(match store::read_text(&path) {
        Ok(content) => MethodResult::success(
            Payload::new()
                .with("exists", true)
                .with("config", toggles::parse_toggles(&content)),
        ),
        Err(e) => store_failure(e),
    })
}

/// 按提交的开关改写优化配置文件（其它行保持原样）。
pub fn write_optimization(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let invalid = DispatchError::InvalidArgument {
        index: 0,
        name: "config",
        expected: "object of booleans",
    };
    let Value::Object(raw) = args.value(0, "config")? else {
        return Err(invalid);
    };
    let mut config = BTreeMap::new();
    for (id, enabled) in raw {
        let Some(enabled) = enabled.as_bool() else {
            return Err(invalid);
        };
        config.insert(id.clone(), enabled);
    }

    let path = ctx.optimization_config_path();
    let current = if path.is_file() {
        match store::read_text(&path) {
            Ok(text) => text,
            Err(e) => return Ok(store_failure(e)),
        }
    } else {
        String::new()
    };
    let updated = toggles::apply_toggles(&current, &config);
    info!(path = %path.display(), count = config.len(), "写入优化开关");
    Ok(match store::write_text(&path, &updated) {
        Ok(()) => MethodResult::ok(),
        Err(e) => store_failure(e),
    })
}

pub fn optimization_path(ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    let path = ctx.optimization_config_path();
    Ok(MethodResult::success(
        Payload::new()
            .with("path", path.to_string_lossy())
            .with("exists", path.is_file()),
    ))
}

/// 探测到的缺省路径叠加用户保存的路径。
pub fn read_settings_paths(ctx: &HostContext) -> Result<MethodResult, DispatchError> {
    let detected = probe::detect_all(&SystemHost);
    Ok(match settings::load(&ctx.settings_paths_file()) {
        Ok(saved) => MethodResult::success(Payload::new().with("paths", settings::merge(&detected, saved))),
        Err(e) => store_failure(e),
    })
}

pub fn write_settings_paths(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let Value::Object(map) = args.value(0, "paths")? else {
        return Err(DispatchError::InvalidArgument {
            index: 0,
            name: "paths",
            expected: "object",
        });
    };
    Ok(match settings::save(&ctx.settings_paths_file(), map) {
        Ok(()) => MethodResult::ok(),
        Err(e) => store_failure(e),
    })
}

/// 读取游戏的 `options.lua`（路径支持 `%VAR%`，为空时使用默认位置）。
pub fn read_options_lua(ctx: &HostContext, args: Args<'_>) -> Result<MethodResult, DispatchError> {
    let raw = args
        .opt_string(0, "path")?
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OPTIONS_LUA.to_string());
    let path = ctx.resolve(&paths::expand_env_vars(&raw));
    Ok(match options_lua::read_options_file(&path) {
        Ok(settings) => MethodResult::success(Payload::new().with("settings", settings)),
        Err(e) => store_failure(e),
    })
}
