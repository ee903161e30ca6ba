//! 优化开关清单（`ID<TAB>+|-<TAB># 说明`）。
//!
//! 文件由外部优化脚本读取，UI 只改动开关位：
//! - 解析：只识别 `^[A-Z][A-Z0-9_]+\s+[+-]\s+#` 形态的行
//! - 写回：仅替换匹配行的 `+`/`-` 字符，其余字节（含 `\r\n`、注释、未知行）保持不变
//! - 缺失的分类总开关追加到文件末尾
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

/// 分类总开关：(ID, 缺省状态, 说明)。
pub const CATEGORY_TOGGLES: &[(&str, bool, &str)] = &[
    ("REGISTRY_OPTIMIZATION", true, "Apply registry optimizations"),
    ("SERVICES_OPTIMIZATION", true, "Apply Windows services optimizations"),
    ("TASKS_OPTIMIZATION", true, "Apply scheduled tasks optimizations"),
    ("CACHE_CLEANING", false, "Clean shader and temp caches"),
];

fn toggle_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z][A-Z0-9_]+)\s+([+-])\s+#").expect("toggle regex is valid"))
}

/// 解析开关清单为 `ID → 是否启用`。
pub fn parse_toggles(content: &str) -> BTreeMap<String, bool> {
    content
        .lines()
        .filter_map(|line| toggle_line().captures(line))
        .map(|caps| (caps[1].to_string(), &caps[2] == "+"))
        .collect()
}

/// 按 `config` 改写开关位并返回新文本。
///
/// 参数：
/// - `content`：现有文件内容（文件不存在时传空字符串）
/// - `config`：UI 提交的 `ID → 是否启用`；未出现在文件中的普通 ID 会被忽略
///
/// 返回值：
/// - 改写后的完整文本；换行风格沿用原文件（无法判断时使用 `\r\n`）
pub fn apply_toggles(content: &str, config: &BTreeMap<String, bool>) -> String {
    let newline = if content.contains("\r\n") || !content.contains('\n') {
        "\r\n"
    } else {
        "\n"
    };

    let mut out = String::with_capacity(content.len() + 256);
    let mut seen = BTreeSet::new();

    for chunk in content.split_inclusive('\n') {
        let Some(caps) = toggle_line().captures(chunk) else {
            out.push_str(chunk);
            continue;
        };
        let id = caps[1].to_string();
        let sign = caps.get(2).map(|m| m.range());
        match (config.get(&id), sign) {
            (Some(enabled), Some(range)) => {
                out.push_str(&chunk[..range.start]);
                out.push(if *enabled { '+' } else { '-' });
                out.push_str(&chunk[range.end..]);
            }
            _ => out.push_str(chunk),
        }
        seen.insert(id);
    }

    let missing: Vec<_> = CATEGORY_TOGGLES
        .iter()
        .filter(|(id, _, _)| !seen.contains(*id))
        .collect();
    if !missing.is_empty() && !out.is_empty() && !out.ends_with('\n') {
        out.push_str(newline);
    }
    for (id, default, desc) in missing {
        let enabled = config.get(*id).copied().unwrap_or(*default);
        out.push_str(&format!("{id}\t{}\t# {desc}{newline}", if enabled { '+' } else { '-' }));
    }
    out
}
