//! 传输层：标准输入输出 / 本机 TCP，协议均为“单行一条 JSON”。
//!
//! 说明：
//! - stdio：读 stdin、写 stdout；stdin 结束后停止会话并把剩余信封写完
//! - tcp：每个连接拥有独立的桥接会话（脚本槽、日志监视槽互不影响）
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::bridge::Bridge;
use crate::context::HostContext;
use crate::sink::{self, EnvelopeSink};

/// 输入结束后等待剩余信封写出的上限。
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 驱动一个会话：逐行读取请求，所有出站信封由单独任务写出。
///
/// 参数：
/// - `ctx`：宿主上下文
/// - `reader` / `writer`：连接的读写两端
///
/// 异常处理：
/// - 读取失败视为连接结束；非 UTF-8 的行不会结束会话
/// - 输出端写入失败只记录日志
pub async fn serve_session<R, W>(ctx: Arc<HostContext>, mut reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sink, rx) = EnvelopeSink::channel();
    let writer_task = tokio::spawn(sink::drain(rx, writer));
    let bridge = Bridge::new(ctx, sink);

    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                // 非 UTF-8 字节按替换字符解码，由桥接层按普通请求处理。
                let line = String::from_utf8_lossy(&buf);
                if line.trim().is_empty() {
                    continue;
                }
                bridge.handle_message(line.trim_end_matches(['\r', '\n']));
            }
            Err(e) => {
                debug!(error = %e, "读取请求失败，结束会话");
                break;
            }
        }
    }

    // 桥接会话释放时会结束脚本与监视；仍在执行的请求完成后通道才会关闭。
    drop(bridge);
    match tokio::time::timeout(DRAIN_TIMEOUT, writer_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %format!("{e:#}"), "写出信封失败"),
        Ok(Err(e)) => warn!(error = %e, "信封写出任务异常退出"),
        Err(_) => warn!("等待剩余信封写出超时"),
    }
    Ok(())
}

/// stdio 模式（默认）。
pub async fn serve_stdio(ctx: Arc<HostContext>) -> Result<()> {
    info!("使用标准输入输出通信");
    let stdin = BufReader::new(tokio::io::stdin());
    serve_session(ctx, stdin, tokio::io::stdout()).await
}

/// TCP 模式：监听本机地址，每个连接一个会话。
///
/// 异常处理：
/// - 绑定失败返回错误
/// - `accept()` 失败会直接向上传播（通常为系统资源问题）
pub async fn serve_tcp(addr: SocketAddr, ctx: Arc<HostContext>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("绑定监听地址失败: {addr}"))?;
    info!(addr = %listener.local_addr()?, "TCP 监听已启动");
    loop {
        let (stream, peer) = listener.accept().await?;
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            info!(%peer, "UI 已连接");
            let (reader, writer) = stream.into_split();
            if let Err(e) = serve_session(ctx, BufReader::new(reader), writer).await {
                warn!(%peer, error = %format!("{e:#}"), "会话异常结束");
            }
            info!(%peer, "UI 已断开");
        });
    }
}
