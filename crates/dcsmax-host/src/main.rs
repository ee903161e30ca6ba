//! DCS-Max 宿主进程入口。
//!
//! 职责：
//! - 解析命令行、加载宿主配置、确定项目根目录
//! - 初始化日志（输出到 stderr，stdout 专用于信封）
//! - 选择传输方式（默认 stdio，`--listen` 时为本机 TCP）
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dcsmax_core::config::HostConfig;
use dcsmax_core::paths;
use dcsmax_host::context::HostContext;
use dcsmax_host::transport;
use tracing::{info, warn};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dcsmax-host", version)]
struct Cli {
    /// 宿主配置文件（缺省时读取 exe 同目录下的 dcs-max-host.json）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 显式指定项目根目录
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// 改用本机 TCP 监听，例如 127.0.0.1:17800
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// 默认日志级别（RUST_LOG 中的设置仍然生效）
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// 程序入口：初始化日志、加载配置并运行所选传输。
///
/// 异常处理：
/// - 配置文件存在但无法解析、监听地址绑定失败时返回错误
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let exe_dir = paths::current_exe_dir()
        .map_err(|e| warn!(error = %e, "无法确定程序所在目录"))
        .ok();
    let (config, source) = HostConfig::load_or_default(cli.config.as_deref(), exe_dir.as_deref())
        .context("加载宿主配置失败")?;
    match &source {
        Some(path) => info!(path = %path.display(), "已加载宿主配置"),
        None => info!("未找到宿主配置文件，使用默认值"),
    }

    let ctx = Arc::new(HostContext::discover(config, cli.project_root, exe_dir.as_deref()));
    match cli.listen {
        Some(addr) => transport::serve_tcp(addr, ctx).await,
        None => transport::serve_stdio(ctx).await,
    }
}

fn init_tracing(level: &str) {
    let directive = level.parse::<Directive>().unwrap_or_else(|_| Directive::from(LevelFilter::INFO));
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
