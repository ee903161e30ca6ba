//! 第三方工具路径探测结果模型。
//!
//! 探测顺序：注册表 → 常见安装路径 → 默认猜测（`found:false`）。
//! 实际探测逻辑依赖操作系统，位于 `dcsmax-windows::probe`。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 路径来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSource {
    Registry,
    Filesystem,
    Default,
}

/// 单个工具的探测结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPath {
    pub found: bool,
    pub path: String,
    pub source: PathSource,
}

impl DetectedPath {
    pub fn registry(path: impl Into<String>) -> Self {
        Self {
            found: true,
            path: path.into(),
            source: PathSource::Registry,
        }
    }

    pub fn filesystem(path: impl Into<String>) -> Self {
        Self {
            found: true,
            path: path.into(),
            source: PathSource::Filesystem,
        }
    }

    /// 未找到时的默认猜测路径。
    pub fn fallback(path: impl Into<String>) -> Self {
        Self {
            found: false,
            path: path.into(),
            source: PathSource::Default,
        }
    }
}

/// 工具键（`dcsExe`、`savedGames` 等）→ 探测结果。
pub type DetectedPaths = BTreeMap<String, DetectedPath>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let v = serde_json::to_value(DetectedPath::fallback("C:\\x.exe")).unwrap();
        assert_eq!(v, serde_json::json!({"found": false, "path": "C:\\x.exe", "source": "default"}));
        let v = serde_json::to_value(DetectedPath::registry("C:\\DCS")).unwrap();
        assert_eq!(v["source"], "registry");
    }
}
