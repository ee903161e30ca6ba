//! 第三方工具路径探测（尽力而为，不作为硬依赖）。
//!
//! 探测顺序：
//! 1. 注册表（安装目录/App Paths 等）
//! 2. 常见安装路径
//! 3. 默认猜测路径（`found:false`, `source:"default"`）
//!
//! 说明：
//! - 环境访问通过 [`ProbeHost`] 抽象，测试可注入“空机器”
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::Path;

use dcsmax_core::detect::{DetectedPath, DetectedPaths};
use dcsmax_core::paths::expand_with;
use tracing::debug;

use crate::registry::{self, Hive};

/// 探测所需的环境访问。
pub trait ProbeHost {
    /// 读取注册表字符串值；不存在时返回 `None`。
    fn registry_string(&self, hive: Hive, key: &str, value: &str) -> Option<String>;
    fn exists(&self, path: &Path) -> bool;
    fn var(&self, name: &str) -> Option<String>;
}

/// 真实系统环境。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl ProbeHost for SystemHost {
    fn registry_string(&self, hive: Hive, key: &str, value: &str) -> Option<String> {
        registry::read_string(hive, key, value).ok()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// 注册表线索：读到的目录拼接 `suffix` 即为候选路径。
struct RegistryHint {
    hive: Hive,
    key: &'static str,
    value: &'static str,
    suffix: &'static str,
}

/// 需要探测的工具。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    DcsExe,
    SavedGames,
    CapFrameX,
    AutoHotkey,
    VrClient,
    NotepadPlusPlus,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::DcsExe,
        Tool::SavedGames,
        Tool::CapFrameX,
        Tool::AutoHotkey,
        Tool::VrClient,
        Tool::NotepadPlusPlus,
    ];

    /// 线上结果中的键名。
    pub fn key(self) -> &'static str {
        match self {
            Tool::DcsExe => "dcsExe",
            Tool::SavedGames => "savedGames",
            Tool::CapFrameX => "capframex",
            Tool::AutoHotkey => "autohotkey",
            Tool::VrClient => "vrClient",
            Tool::NotepadPlusPlus => "notepadpp",
        }
    }

    fn registry_hints(self) -> &'static [RegistryHint] {
        match self {
            Tool::DcsExe => &[
                RegistryHint {
                    hive: Hive::CurrentUser,
                    key: "Software\\Eagle Dynamics\\DCS World",
                    value: "Path",
                    suffix: "bin\\DCS.exe",
                },
                RegistryHint {
                    hive: Hive::CurrentUser,
                    key: "Software\\Eagle Dynamics\\DCS World OpenBeta",
                    value: "Path",
                    suffix: "bin\\DCS.exe",
                },
                RegistryHint {
                    hive: Hive::LocalMachine,
                    key: "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\App Paths\\DCS.exe",
                    value: "",
                    suffix: "",
                },
            ],
            Tool::CapFrameX => &[RegistryHint {
                hive: Hive::LocalMachine,
                key: "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\App Paths\\CapFrameX.exe",
                value: "",
                suffix: "",
            }],
            Tool::AutoHotkey => &[RegistryHint {
                hive: Hive::LocalMachine,
                key: "SOFTWARE\\AutoHotkey",
                value: "InstallDir",
                suffix: "v2\\AutoHotkey64.exe",
            }],
            Tool::NotepadPlusPlus => &[
                RegistryHint {
                    hive: Hive::LocalMachine,
                    key: "SOFTWARE\\Notepad++",
                    value: "",
                    suffix: "notepad++.exe",
                },
                RegistryHint {
                    hive: Hive::LocalMachine,
                    key: "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\App Paths\\notepad++.exe",
                    value: "",
                    suffix: "",
                },
            ],
            Tool::SavedGames | Tool::VrClient => &[],
        }
    }

    /// 常见安装路径；第一项同时作为默认猜测。
    fn candidates(self) -> &'static [&'static str] {
        match self {
            Tool::DcsExe => &[
                "C:\\Program Files\\Eagle Dynamics\\DCS World\\bin\\DCS.exe",
                "C:\\Program Files\\Eagle Dynamics\\DCS World OpenBeta\\bin\\DCS.exe",
                "C:\\Program Files (x86)\\Steam\\steamapps\\common\\DCSWorld\\bin\\DCS.exe",
            ],
            Tool::SavedGames => &[
                "%USERPROFILE%\\Saved Games\\DCS",
                "%USERPROFILE%\\Saved Games\\DCS.openbeta",
            ],
            Tool::CapFrameX => &[
                "C:\\Program Files (x86)\\CapFrameX\\CapFrameX.exe",
                "C:\\Program Files\\CapFrameX\\CapFrameX.exe",
            ],
            Tool::AutoHotkey => &[
                "%ProgramFiles%\\AutoHotkey\\v2\\AutoHotkey64.exe",
                "%ProgramFiles%\\AutoHotkey\\v2\\AutoHotkey.exe",
                "%ProgramFiles(x86)%\\AutoHotkey\\v2\\AutoHotkey.exe",
                "%LOCALAPPDATA%\\Programs\\AutoHotkey\\v2\\AutoHotkey.exe",
            ],
            Tool::VrClient => VrPlatform::Pimax.install_candidates(),
            Tool::NotepadPlusPlus => &[
                "C:\\Program Files\\Notepad++\\notepad++.exe",
                "C:\\Program Files (x86)\\Notepad++\\notepad++.exe",
            ],
        }
    }
}

/// 展开 `%VAR%`；变量缺失时退回常见默认值，保证默认路径可读。
fn expand(host: &dyn ProbeHost, raw: &str) -> String {
    expand_with(raw, |name| {
        host.var(name).or_else(|| match name {
            "ProgramFiles" => Some("C:\\Program Files".to_string()),
            "ProgramFiles(x86)" => Some("C:\\Program Files (x86)".to_string()),
            _ => None,
        })
    })
}

fn join_windows(dir: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return dir.to_string();
    }
    let dir = dir.trim_end_matches(['\\', '/']);
    format!("{dir}\\{suffix}")
}

/// 探测单个工具。
pub fn detect(tool: Tool, host: &dyn ProbeHost) -> DetectedPath {
    for hint in tool.registry_hints() {
        let Some(dir) = host.registry_string(hint.hive, hint.key, hint.value) else {
            continue;
        };
        let dir = dir.trim().trim_matches('"');
        if dir.is_empty() {
            continue;
        }
        let candidate = join_windows(dir, hint.suffix);
        if host.exists(Path::new(&candidate)) {
            debug!(tool = tool.key(), path = %candidate, "注册表命中");
            return DetectedPath::registry(candidate);
        }
    }

    let candidates = tool.candidates();
    for raw in candidates {
        let candidate = expand(host, raw);
        if host.exists(Path::new(&candidate)) {
            debug!(tool = tool.key(), path = %candidate, "安装路径命中");
            return DetectedPath::filesystem(candidate);
        }
    }

    let fallback = candidates.first().map(|raw| expand(host, raw)).unwrap_or_default();
    DetectedPath::fallback(fallback)
}

/// 探测全部工具；从不失败。
pub fn detect_all(host: &dyn ProbeHost) -> DetectedPaths {
    Tool::ALL
        .iter()
        .map(|tool| (tool.key().to_string(), detect(*tool, host)))
        .collect()
}

/// 按候选顺序解析 AutoHotkey 解释器；都不存在时依赖 PATH。
pub fn resolve_autohotkey(candidates: &[String], host: &dyn ProbeHost) -> String {
    candidates
        .iter()
        .map(|raw| expand(host, raw))
        .find(|p| host.exists(Path::new(p)))
        .unwrap_or_else(|| "AutoHotkey.exe".to_string())
}

/// VR 平台（决定检测哪个客户端进程、默认启动哪个程序）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrPlatform {
    Pimax,
    Meta,
    SteamVr,
    Varjo,
}

impl VrPlatform {
    /// 解析 UI 中的硬件名称；无法识别时按 Pimax 处理（UI 默认值）。
    pub fn from_hardware(hardware: &str) -> Self {
        let h = hardware.to_ascii_lowercase();
        if h.contains("meta") || h.contains("oculus") || h.contains("quest") {
            VrPlatform::Meta
        } else if h.contains("steam") || h.contains("index") || h.contains("vive") {
            VrPlatform::SteamVr
        } else if h.contains("varjo") {
            VrPlatform::Varjo
        } else {
            VrPlatform::Pimax
        }
    }

    /// 表示客户端已在运行的进程名。
    pub fn client_processes(self) -> &'static [&'static str] {
        match self {
            VrPlatform::Pimax => &["PimaxClient.exe"],
            VrPlatform::Meta => &["OculusClient.exe"],
            VrPlatform::SteamVr => &["vrmonitor.exe", "vrserver.exe"],
            VrPlatform::Varjo => &["VarjoBase.exe"],
        }
    }

    pub fn install_candidates(self) -> &'static [&'static str] {
        match self {
            VrPlatform::Pimax => &[
                "C:\\Program Files\\Pimax\\PimaxClient\\pimaxui\\PimaxClient.exe",
                "C:\\Program Files\\Pimax\\Runtime\\PimaxClient.exe",
            ],
            VrPlatform::Meta => &["C:\\Program Files\\Oculus\\Support\\oculus-client\\OculusClient.exe"],
            VrPlatform::SteamVr => &[
                "C:\\Program Files (x86)\\Steam\\steamapps\\common\\SteamVR\\bin\\win64\\vrstartup.exe",
            ],
            VrPlatform::Varjo => &["C:\\Program Files\\Varjo\\varjo-base\\VarjoBase.exe"],
        }
    }

    /// 平台默认客户端路径（已存在者优先）。
    pub fn default_client(self, host: &dyn ProbeHost) -> String {
        let candidates = self.install_candidates();
        candidates
            .iter()
            .map(|raw| expand(host, raw))
            .find(|p| host.exists(Path::new(p)))
            .or_else(|| candidates.first().map(|raw| expand(host, raw)))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeHost {
        registry: HashMap<(Hive, String, String), String>,
        files: HashSet<String>,
        vars: HashMap<String, String>,
    }

    impl ProbeHost for FakeHost {
        fn registry_string(&self, hive: Hive, key: &str, value: &str) -> Option<String> {
            self.registry.get(&(hive, key.to_string(), value.to_string())).cloned()
        }
        fn exists(&self, path: &Path) -> bool {
            self.files.contains(path.to_string_lossy().as_ref())
        }
        fn var(&self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }
    }

    #[test]
    fn registry_wins_over_filesystem() {
        let mut host = FakeHost::default();
        host.registry.insert(
            (Hive::CurrentUser, "Software\\Eagle Dynamics\\DCS World".into(), "Path".into()),
            "D:\\Games\\DCS World\\".into(),
        );
        host.files.insert("D:\\Games\\DCS World\\bin\\DCS.exe".into());
        host.files.insert("C:\\Program Files\\Eagle Dynamics\\DCS World\\bin\\DCS.exe".into());

        let found = detect(Tool::DcsExe, &host);
        assert_eq!(found, DetectedPath::registry("D:\\Games\\DCS World\\bin\\DCS.exe"));
    }

    #[test]
    fn stale_registry_falls_through_to_filesystem() {
        let mut host = FakeHost::default();
        host.registry.insert(
            (Hive::LocalMachine, "SOFTWARE\\Notepad++".into(), "".into()),
            "E:\\gone".into(),
        );
        host.files.insert("C:\\Program Files (x86)\\Notepad++\\notepad++.exe".into());
        let found = detect(Tool::NotepadPlusPlus, &host);
        assert_eq!(found, DetectedPath::filesystem("C:\\Program Files (x86)\\Notepad++\\notepad++.exe"));
    }

    #[test]
    fn env_vars_expand_in_candidates_and_defaults() {
        let mut host = FakeHost::default();
        host.vars.insert("USERPROFILE".into(), "C:\\Users\\pilot".into());
        host.files.insert("C:\\Users\\pilot\\Saved Games\\DCS.openbeta".into());
        let found = detect(Tool::SavedGames, &host);
        assert_eq!(found, DetectedPath::filesystem("C:\\Users\\pilot\\Saved Games\\DCS.openbeta"));

        let ahk = detect(Tool::AutoHotkey, &FakeHost::default());
        assert_eq!(ahk, DetectedPath::fallback("C:\\Program Files\\AutoHotkey\\v2\\AutoHotkey64.exe"));
    }

    #[test]
    fn autohotkey_resolution_order() {
        let candidates: Vec<String> = crate::probe::Tool::AutoHotkey
            .candidates()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut host = FakeHost::default();
        host.vars.insert("LOCALAPPDATA".into(), "C:\\Users\\pilot\\AppData\\Local".into());
        assert_eq!(resolve_autohotkey(&candidates, &host), "AutoHotkey.exe");

        host.files.insert("C:\\Users\\pilot\\AppData\\Local\\Programs\\AutoHotkey\\v2\\AutoHotkey.exe".into());
        assert_eq!(
            resolve_autohotkey(&candidates, &host),
            "C:\\Users\\pilot\\AppData\\Local\\Programs\\AutoHotkey\\v2\\AutoHotkey.exe"
        );

        host.files.insert("C:\\Program Files\\AutoHotkey\\v2\\AutoHotkey.exe".into());
        assert_eq!(
            resolve_autohotkey(&candidates, &host),
            "C:\\Program Files\\AutoHotkey\\v2\\AutoHotkey.exe"
        );
    }

    #[test]
    fn vr_platform_mapping() {
        assert_eq!(VrPlatform::from_hardware("Pimax"), VrPlatform::Pimax);
        assert_eq!(VrPlatform::from_hardware("Meta Quest 3"), VrPlatform::Meta);
        assert_eq!(VrPlatform::from_hardware("SteamVR"), VrPlatform::SteamVr);
        assert_eq!(VrPlatform::from_hardware("Varjo Aero"), VrPlatform::Varjo);
        assert_eq!(VrPlatform::from_hardware(""), VrPlatform::Pimax);
        assert_eq!(VrPlatform::SteamVr.client_processes(), &["vrmonitor.exe", "vrserver.exe"]);
        assert!(VrPlatform::Meta.default_client(&FakeHost::default()).ends_with("OculusClient.exe"));
    }
}
