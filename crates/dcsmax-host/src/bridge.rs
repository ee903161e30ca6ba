//! RPC 桥接：请求信封 → 方法分发 → 响应信封。
//!
//! 约定：
//! - 每个带 `id` 的请求/响应型方法恰好产生一个响应（顺序不保证，靠 `id` 关联）
//! - 会话型方法（`executeScriptStream` / `stopScript` / `watchLog` / `stopWatchLog`）
//!   正常情况下不回响应，只通过事件推送结果
//! - 未知方法返回 `Unknown method: <method>`，不是协议错误
//! - 处理器错误或 panic 在这里统一转换为 `{success:false, error}`；已解析出的 `id` 原样保留，
//!   只有信封本身无法解析时才使用 `id = 0`
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::PathBuf;
use std::sync::Arc;

use dcsmax_core::ipc::{Method, Request, RequestId};
use dcsmax_core::reply::MethodResult;
use dcsmax_windows::probe::{self, SystemHost};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::args::{Args, DispatchError};
use crate::context::HostContext;
use crate::handlers;
use crate::runner::{self, ScriptSlot};
use crate::sink::EnvelopeSink;
use crate::watcher::LogWatchSlot;

/// 一个 UI 连接对应的桥接会话（拥有脚本槽与日志监视槽）。
#[derive(Debug)]
pub struct Bridge {
    ctx: Arc<HostContext>,
    sink: EnvelopeSink,
    scripts: ScriptSlot,
    logs: LogWatchSlot,
}

impl Bridge {
    pub fn new(ctx: Arc<HostContext>, sink: EnvelopeSink) -> Self {
        Self {
            ctx,
            sink,
            scripts: ScriptSlot::new(),
            logs: LogWatchSlot::new(),
        }
    }

    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    /// 处理一条入站消息（须在 Tokio runtime 内调用）。
    ///
    /// 说明：
    /// - 请求/响应型方法在阻塞线程池中执行，本函数立即返回
    /// - 会话型方法在当前任务内完成启动/停止；`watchLog` 的目录创建与系统监视注册交给阻塞线程池
    pub fn handle_message(&self, text: &str) {
        let request = match Request::parse(text) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "无法解析请求信封");
                self.sink
                    .respond(0, &MethodResult::failure(format!("Invalid request: {e}")));
                return;
            }
        };
        let Some(method) = Method::from_name(&request.method) else {
            warn!(id = request.id, method = %request.method, "未知方法");
            self.sink.respond(
                request.id,
                &MethodResult::failure(format!("Unknown method: {}", request.method)),
            );
            return;
        };
        debug!(id = request.id, method = method.name(), "收到请求");

        if method.is_fire_and_forget() {
            if let Err(e) = self.handle_session(request.id, method, &request.args) {
                warn!(id = request.id, method = method.name(), error = %e, "会话方法失败");
                self.sink.respond(request.id, &exception(&e));
            }
            return;
        }
        self.spawn_call(request.id, method, request.args);
    }

    fn spawn_call(&self, id: RequestId, method: Method, args: Vec<Value>) {
        let ctx = Arc::clone(&self.ctx);
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let joined = tokio::task::spawn_blocking(move || handlers::dispatch(method, &args, &ctx)).await;
            let result = match joined {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!(id, method = method.name(), error = %e, "方法执行失败");
                    exception(&e)
                }
                Err(e) => {
                    error!(id, method = method.name(), error = %e, "方法处理任务异常退出");
                    MethodResult::failure(format!("Host exception: {e}"))
                }
            };
            debug!(id, method = method.name(), success = result.is_success(), "回送响应");
            sink.respond(id, &result);
        });
    }

    fn handle_session(&self, id: RequestId, method: Method, raw: &[Value]) -> Result<(), DispatchError> {
        let args = Args::new(raw);
        let config = &self.ctx.config;
        match method {
            Method::ExecuteScriptStream => {
                let script = self.ctx.resolve(&args.string(0, "path")?);
                let script_args = args.string_list(1, "args")?;
                let plan = runner::plan_script(&config.interpreters, &script, &script_args, || {
                    probe::resolve_autohotkey(&config.autohotkey_candidates, &SystemHost)
                });
                info!(script = %script.display(), "启动流式脚本");
                self.scripts.start(plan, self.sink.clone());
            }
            Method::StopScript => {
                if self.scripts.stop() {
                    info!("已请求结束流式脚本");
                }
            }
            Method::WatchLog => {
                let path = self.ctx.resolve(&args.string(0, "path")?);
                self.spawn_watch(id, path);
            }
            Method::StopWatchLog => {
                self.logs.stop();
            }
            other => return Err(anyhow::anyhow!("{} is not a session method", other.name()).into()),
        }
        Ok(())
    }

    /// 在阻塞线程池中建立日志监视；世代号在这里同步领取，
    /// 之后到达的 `stopWatchLog` / `watchLog` 会让这次安装作废。
    fn spawn_watch(&self, id: RequestId, path: PathBuf) {
        let ticket = self.logs.begin();
        let slot = self.logs.clone();
        let settle = self.ctx.config.log_settle();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let events = sink.clone();
            let joined =
                tokio::task::spawn_blocking(move || slot.install(ticket, &path, settle, events)).await;
            let failure = match joined {
                Ok(Ok(())) => return,
                Ok(Err(e)) => {
                    warn!(id, error = %format!("{e:#}"), "建立日志监视失败");
                    exception(&DispatchError::from(e))
                }
                Err(e) => {
                    error!(id, error = %e, "日志监视任务异常退出");
                    MethodResult::failure(format!("Host exception: {e}"))
                }
            };
            sink.respond(id, &failure);
        });
    }

    /// 释放会话资源（结束脚本、停止监视）；连接关闭时调用。
    pub fn shutdown(&self) {
        self.scripts.stop();
        self.logs.stop();
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 处理器错误 → 线上错误结果；内部错误只带最底层的系统消息。
fn exception(e: &DispatchError) -> MethodResult {
    let message = match e {
        DispatchError::Other(inner) => inner.root_cause().to_string(),
        other => other.to_string(),
    };
    MethodResult::failure(format!("Host exception: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_errors_keep_their_text() {
        let e = DispatchError::MissingArgument { index: 0, name: "path" };
        assert_eq!(
            exception(&e).to_value()["error"],
            "Host exception: Missing argument #0 (path)"
        );
        let e = DispatchError::from(anyhow::anyhow!("disk full").context("写入失败"));
        assert_eq!(exception(&e).to_value()["error"], "Host exception: disk full");
    }
}
