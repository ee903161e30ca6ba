//! 用户确认过的工具路径（dcs-max-paths.json）。
//!
//! 读取时以探测结果为底，再覆盖用户保存的值；
//! 保存时原样写入 UI 提交的对象。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

use crate::detect::DetectedPaths;
use crate::error::StoreError;
use crate::store;

/// 读取已保存的路径对象；文件不存在时返回空对象。
///
/// 异常处理：
/// - 文件存在但不是 JSON 对象时记录警告并按空对象处理
pub fn load(path: &Path) -> Result<Map<String, Value>, StoreError> {
    match store::read_json(path) {
        Ok((_, Value::Object(map))) => Ok(map),
        Ok(_) => {
            warn!(path = %path.display(), "路径配置不是 JSON 对象，已忽略");
            Ok(Map::new())
        }
        Err(StoreError::NotFound(_)) => Ok(Map::new()),
        Err(StoreError::Json(e)) => {
            warn!(path = %path.display(), error = %e, "路径配置解析失败，已忽略");
            Ok(Map::new())
        }
        Err(e) => Err(e),
    }
}

pub fn save(path: &Path, paths: &Map<String, Value>) -> Result<(), StoreError> {
    store::write_json_pretty(path, paths)
}

/// 合并探测结果与已保存的路径。
///
/// 规则：
/// - 探测结果提供每个工具的缺省路径字符串
/// - 已保存的非空字符串覆盖缺省值；其它非空值（例如嵌套对象）原样保留
pub fn merge(detected: &DetectedPaths, saved: Map<String, Value>) -> Map<String, Value> {
    let mut merged: Map<String, Value> = detected
        .iter()
        .map(|(k, d)| (k.clone(), Value::String(d.path.clone())))
        .collect();
    for (key, value) in saved {
        let keep = match &value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        };
        if keep {
            merged.insert(key, value);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectedPath;
    use serde_json::json;

    #[test]
    fn saved_values_override_detected_defaults() {
        let mut detected = DetectedPaths::new();
        detected.insert("dcsExe".into(), DetectedPath::fallback("C:\\DCS\\bin\\DCS.exe"));
        detected.insert("capframex".into(), DetectedPath::filesystem("C:\\CFX\\CapFrameX.exe"));

        let saved = json!({"dcsExe": "D:\\DCS World\\bin\\DCS.exe", "capframex": "", "pimax": "E:\\Pimax\\PimaxClient.exe"});
        let Value::Object(saved) = saved else { unreachable!() };
        let merged = merge(&detected, saved);

        assert_eq!(merged["dcsExe"], "D:\\DCS World\\bin\\DCS.exe");
        assert_eq!(merged["capframex"], "C:\\CFX\\CapFrameX.exe");
        assert_eq!(merged["pimax"], "E:\\Pimax\\PimaxClient.exe");
    }

    #[test]
    fn load_tolerates_missing_and_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dcs-max-paths.json");
        assert!(load(&path).unwrap().is_empty());

        std::fs::write(&path, "not json").unwrap();
        assert!(load(&path).unwrap().is_empty());

        let mut map = Map::new();
        map.insert("dcsExe".into(), json!("C:\\DCS.exe"));
        save(&path, &map).unwrap();
        assert_eq!(load(&path).unwrap(), map);
    }
}
