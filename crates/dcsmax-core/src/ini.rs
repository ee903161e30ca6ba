//! 宽松 INI 解析（测试矩阵等配置文件）。
//!
//! 规则：
//! - `;` 或 `#` 开头的行为注释
//! - `[section]` 开启新节；节外的键值被丢弃
//! - `key = value` 以第一个 `=` 分割，两侧去空白；值不做类型转换
//! - 同名键后者覆盖前者；无 `=` 的行忽略
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::collections::BTreeMap;

/// 节名 → (键 → 原始字符串值)。
pub type IniDocument = BTreeMap<String, BTreeMap<String, String>>;

pub fn parse_ini(content: &str) -> IniDocument {
    let mut doc = IniDocument::new();
    let mut section: Option<String> = None;

    for raw in content.split('\n') {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            let name = line[1..line.len() - 1].to_string();
            doc.entry(name.clone()).or_default();
            section = Some(name);
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match section.as_deref() {
            Some(name) if !name.is_empty() => {
                doc.entry(name.to_string())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {}
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_section_and_key() {
        let doc = parse_ini("[A]\nk = v\n");
        assert_eq!(doc.len(), 1);
        assert_eq!(doc["A"]["k"], "v");
    }

    #[test]
    fn keys_before_first_section_are_dropped() {
        let doc = parse_ini("orphan=1\r\n[Test]\r\nduration=60\r\n");
        assert_eq!(doc.len(), 1);
        assert_eq!(doc["Test"].get("orphan"), None);
        assert_eq!(doc["Test"]["duration"], "60");
    }

    #[test]
    fn comments_malformed_lines_and_duplicates() {
        let doc = parse_ini(
            "; header\n# note\n[Run]\nmalformed line\npath = C:\\a=b\nmode=fast\nmode = slow\n[Empty]\n",
        );
        assert_eq!(doc["Run"].len(), 2);
        assert_eq!(doc["Run"]["path"], "C:\\a=b");
        assert_eq!(doc["Run"]["mode"], "slow");
        assert!(doc["Empty"].is_empty());
    }
}
