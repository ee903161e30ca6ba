//! 宿主运行上下文（配置 + 已解析的项目根目录）。
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::{Path, PathBuf};

use dcsmax_core::config::HostConfig;
use dcsmax_core::paths;
use tracing::info;

/// 各处理器共享的只读上下文。
#[derive(Debug, Clone)]
pub struct HostContext {
    pub config: HostConfig,
    pub project_root: PathBuf,
}

impl HostContext {
    pub fn new(config: HostConfig, project_root: PathBuf) -> Self {
        Self { config, project_root }
    }

    /// 确定项目根并构造上下文。
    ///
    /// 优先级：
    /// 1. 命令行 `--project-root`
    /// 2. 配置文件中的 `project_root`
    /// 3. 从 exe 所在目录向上探测标记目录
    /// 4. 当前工作目录（exe 路径不可读时）
    pub fn discover(config: HostConfig, cli_root: Option<PathBuf>, exe_dir: Option<&Path>) -> Self {
        let root = cli_root
            .or_else(|| config.project_root.clone())
            .or_else(|| exe_dir.map(|dir| paths::resolve_project_root(dir, &config.marker_dir)))
            .unwrap_or_else(|| PathBuf::from("."));
        info!(root = %root.display(), "项目根目录已确定");
        Self::new(config, root)
    }

    /// 将 UI 传入的路径解析到项目根下。
    pub fn resolve(&self, raw: &str) -> PathBuf {
        paths::resolve_under_root(&self.project_root, raw)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.resolve(&self.config.backups_dir)
    }

    pub fn optimization_config_path(&self) -> PathBuf {
        self.resolve(&self.config.optimization_config)
    }

    pub fn settings_paths_file(&self) -> PathBuf {
        self.resolve(&self.config.settings_paths_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_beats_config_and_probe() {
        let cfg = HostConfig {
            project_root: Some(PathBuf::from("/from/config")),
            ..HostConfig::default()
        };
        let ctx = HostContext::discover(cfg.clone(), Some(PathBuf::from("/from/cli")), None);
        assert_eq!(ctx.project_root, PathBuf::from("/from/cli"));

        let ctx = HostContext::discover(cfg, None, Some(Path::new("/opt/x/bin")));
        assert_eq!(ctx.project_root, PathBuf::from("/from/config"));
    }

    #[test]
    fn derived_paths_follow_config() {
        let ctx = HostContext::new(HostConfig::default(), PathBuf::from("/root"));
        assert_eq!(ctx.backups_dir(), PathBuf::from("/root").join("Backups"));
        assert!(ctx
            .optimization_config_path()
            .ends_with("5.0-optimization-settings.txt"));
        assert_eq!(ctx.settings_paths_file(), PathBuf::from("/root").join("dcs-max-paths.json"));
    }
}
