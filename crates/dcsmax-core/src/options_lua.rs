//! DCS `options.lua` 读取。
//!
//! 说明：
//! - 文件在独立的 Lua 虚拟机中执行：不加载任何标准库，全局环境是一张空表
//! - 执行设有指令数上限，死循环会以错误结束
//! - 结果取 `options` 变量；文件没有该变量时返回全部顶层变量
//!
//! 映射到 JSON：
//! - 键恰好为 `1..=n` 的表映射为数组，其余映射为对象（数字键转为字符串）
//! - `nil` 值的键被省略；函数等无法表示的值视为错误
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::Path;

use mlua::{HookTriggers, Lua, LuaOptions, StdLib, Table, Value as LuaValue};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::error::StoreError;

/// 单个文件允许执行的 Lua 指令上限。
const MAX_INSTRUCTIONS: u32 = 10_000_000;

/// 表嵌套深度上限（同时挡住自引用的表）。
const MAX_DEPTH: usize = 64;

/// 执行或转换失败。
#[derive(Debug, Error)]
#[error("Lua parse error: {0}")]
pub struct LuaError(#[from] mlua::Error);

/// 执行整个 chunk，返回顶层变量表。
pub fn parse_chunk(src: &str) -> Result<Map<String, Value>, LuaError> {
    let lua = Lua::new_with(StdLib::NONE, LuaOptions::default())?;
    let env = lua.create_table()?;
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(MAX_INSTRUCTIONS),
        |_lua, _debug| {
            Err(mlua::Error::RuntimeError(format!(
                "instruction limit exceeded ({MAX_INSTRUCTIONS})"
            )))
        },
    );
    let result = lua
        .load(src)
        .set_name("=options.lua")
        .set_environment(env.clone())
        .exec();
    lua.remove_hook();
    result?;

    let mut vars = Map::new();
    for (key, value) in table_entries(env, 0)? {
        vars.insert(key.into_string(), value);
    }
    Ok(vars)
}

/// 解析 `options.lua`：返回 `options` 变量；不存在时返回整个 chunk。
pub fn parse_options(src: &str) -> Result<Value, LuaError> {
    let mut chunk = parse_chunk(src)?;
    Ok(chunk.remove("options").unwrap_or(Value::Object(chunk)))
}

/// 读取并解析 `options.lua` 文件。
///
/// 异常处理：
/// - 文件不存在返回 [`StoreError::NotFound`]；语法或执行错误返回 [`StoreError::Lua`]
pub fn read_options_file(path: &Path) -> Result<Value, StoreError> {
    let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(parse_options(text.trim_start_matches('\u{feff}'))?)
}

enum Key {
    Int(i64),
    Other(String),
}

impl Key {
    fn into_string(self) -> String {
        match self {
            Key::Int(n) => n.to_string(),
            Key::Other(s) => s,
        }
    }
}

fn unsupported(what: &str) -> mlua::Error {
    mlua::Error::RuntimeError(format!("unsupported value in options: {what}"))
}

fn to_json(value: LuaValue, depth: usize) -> Result<Value, mlua::Error> {
    match value {
        LuaValue::Nil => Ok(Value::Null),
        LuaValue::Boolean(b) => Ok(Value::Bool(b)),
        LuaValue::Integer(i) => Ok(Value::Number(i.into())),
        LuaValue::Number(n) => Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| unsupported("non-finite number")),
        LuaValue::String(s) => Ok(Value::String(s.to_string_lossy().into())),
        LuaValue::Table(table) => Ok(into_json(table_entries(table, depth + 1)?)),
        other => Err(unsupported(other.type_name())),
    }
}

/// 按键排序取出表中全部非 `nil` 项。
fn table_entries(table: Table, depth: usize) -> Result<Vec<(Key, Value)>, mlua::Error> {
    if depth > MAX_DEPTH {
        return Err(mlua::Error::RuntimeError("table nesting too deep".into()));
    }
    let mut entries = Vec::new();
    for pair in table.pairs::<LuaValue, LuaValue>() {
        let (key, value) = pair?;
        let key = match key {
            LuaValue::Integer(n) => Key::Int(n),
            LuaValue::Number(n) => Key::Other(n.to_string()),
            LuaValue::String(s) => Key::Other(s.to_string_lossy().into()),
            LuaValue::Boolean(b) => Key::Other(b.to_string()),
            other => return Err(unsupported(other.type_name())),
        };
        entries.push((key, to_json(value, depth)?));
    }
    entries.sort_by_key(|(key, _)| match key {
        Key::Int(n) => (0, *n),
        Key::Other(_) => (1, 0),
    });
    Ok(entries)
}

fn into_json(entries: Vec<(Key, Value)>) -> Value {
    let is_sequence = !entries.is_empty()
        && entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| matches!(k, Key::Int(n) if *n == i as i64 + 1));
    if is_sequence {
        return Value::Array(entries.into_iter().map(|(_, v)| v).collect());
    }
    let mut map = Map::new();
    for (key, value) in entries {
        map.insert(key.into_string(), value);
    }
    Value::Object(map)
}
