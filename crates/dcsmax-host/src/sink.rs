//! 出站信封通道（多生产者 → 单消费者）。
//!
//! 说明：
//! - 响应、脚本输出、日志更新都只往通道里投递，从不直接写 UI 连接
//! - 唯一的消费者 [`drain`] 逐条序列化并写出，因此 UI 观察到的顺序即投递顺序
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use anyhow::{Context, Result};
use dcsmax_core::ipc::{Event, Outbound, RequestId, Response};
use dcsmax_core::reply::MethodResult;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// 出站信封的投递端（可自由克隆给各生产者）。
#[derive(Debug, Clone)]
pub struct EnvelopeSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl EnvelopeSink {
    /// 创建投递端与唯一的接收端。
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn respond(&self, id: RequestId, result: &MethodResult) {
        self.send(Outbound::Response(Response::new(id, result)));
    }

    pub fn emit(&self, event: Event) {
        self.send(Outbound::Event(event));
    }

    /// 接收端已关闭（连接断开）时丢弃信封。
    fn send(&self, envelope: Outbound) {
        if self.tx.send(envelope).is_err() {
            debug!("出站通道已关闭，信封被丢弃");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 唯一消费者：把信封逐行写到 `writer`，直到所有投递端都被释放。
///
/// 异常处理：
/// - 单条信封序列化失败只记录警告并跳过
/// - 写入失败（对端关闭）时返回错误
pub async fn drain<W>(mut rx: mpsc::UnboundedReceiver<Outbound>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = rx.recv().await {
        let mut line = match envelope.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "序列化出站信封失败");
                continue;
            }
        };
        line.push('\n');
        writer.write_all(line.as_bytes()).await.context("写出信封失败")?;
        writer.flush().await.context("刷新输出失败")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_preserves_hand_off_order() {
        let (sink, rx) = EnvelopeSink::channel();
        sink.emit(Event::stdout("one"));
        sink.respond(4, &MethodResult::ok());
        sink.emit(Event::log("two"));
        drop(sink);

        let mut out = Vec::new();
        drain(rx, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"scriptOutput\""));
        assert_eq!(lines[1], r#"{"id":4,"result":{"success":true}}"#);
        assert!(lines[2].contains("\"logUpdated\""));
    }

    #[tokio::test]
    async fn sending_after_close_is_silent() {
        let (sink, rx) = EnvelopeSink::channel();
        drop(rx);
        assert!(sink.is_closed());
        sink.emit(Event::stdout("lost"));
    }
}
