//! 单文件日志监视（单槽）。
//!
//! 行为：
//! - 启动时立即读取一次完整内容并推送（内容为空则不推送）
//! - 文件被写入后等待一个短暂的稳定期，再整体重读并推送（同样跳过空内容）
//! - 新的监视会替换旧的监视；停止后忘记路径
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dcsmax_core::ipc::Event;
use dcsmax_core::{paths, store};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::sink::EnvelopeSink;

/// 工作线程检查停止标志的间隔。
const POLL_INTERVAL: Duration = Duration::from_millis(200);

struct ActiveWatch {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    // 释放即停止系统级监视。
    _watcher: RecommendedWatcher,
}

impl ActiveWatch {
    fn halt(self) {
        self.stop.store(true, Ordering::SeqCst);
        info!(path = %self.path.display(), "停止监视日志");
    }
}

#[derive(Default)]
struct WatchState {
    // 每次开始/停止都会递增；安装时世代不符说明请求已被取代。
    generation: u64,
    active: Option<ActiveWatch>,
}

/// 日志监视槽（可克隆，克隆体共享同一个槽位）。
#[derive(Clone, Default)]
pub struct LogWatchSlot {
    state: Arc<Mutex<WatchState>>,
}

impl std::fmt::Debug for LogWatchSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWatchSlot")
            .field("watched", &self.watched_path())
            .finish()
    }
}

impl LogWatchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 停止已有的监视并领取一个世代号，供随后的 [`LogWatchSlot::install`] 使用。
    ///
    /// 不做任何 I/O，可在异步任务中直接调用。
    pub fn begin(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        if let Some(active) = state.active.take() {
            active.halt();
        }
        state.generation
    }

    /// 开始监视 `path`（先停止已有的监视）。
    pub fn start(&self, path: &Path, settle: Duration, sink: EnvelopeSink) -> Result<()> {
        let ticket = self.begin();
        self.install(ticket, path, settle, sink)
    }

    /// 建立系统监视并推送当前内容（阻塞调用）。
    ///
    /// 参数：
    /// - `ticket`：[`LogWatchSlot::begin`] 返回的世代号；期间若有新的开始/停止，本次安装作废
    /// - `path`：已解析的日志文件绝对路径
    /// - `settle`：写入后到重读之间的等待时间
    /// - `sink`：事件投递端
    ///
    /// 异常处理：
    /// - 目录无法创建或系统监视注册失败时返回错误（此时槽位为空）
    pub fn install(&self, ticket: u64, path: &Path, settle: Duration, sink: EnvelopeSink) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| anyhow!("日志路径缺少文件名: {}", path.display()))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        paths::ensure_dir(&dir)?;

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx).context("创建文件监视器失败")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("注册目录监视失败: {}", dir.display()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let target = path.to_path_buf();
        let worker_sink = sink.clone();
        std::thread::Builder::new()
            .name("log-watch".to_string())
            .spawn(move || watch_loop(rx, target, file_name, settle, worker_stop, worker_sink))
            .context("启动日志监视线程失败")?;

        let active = ActiveWatch {
            path: path.to_path_buf(),
            stop,
            _watcher: watcher,
        };
        let mut state = self.lock();
        if state.generation != ticket {
            debug!(path = %path.display(), "监视请求已被取代，放弃安装");
            active.stop.store(true, Ordering::SeqCst);
            return Ok(());
        }
        info!(path = %path.display(), "开始监视日志");
        state.active = Some(active);
        // 监视已生效后再做首次读取，期间的写入至少会触发一次重读。
        emit_if_present(path, &sink);
        Ok(())
    }

    /// 停止当前监视；没有监视时返回 `false`。
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        state.generation += 1;
        match state.active.take() {
            Some(active) => {
                active.halt();
                true
            }
            None => false,
        }
    }

    pub fn watched_path(&self) -> Option<PathBuf> {
        self.lock().active.as_ref().map(|a| a.path.clone())
    }
}

fn emit_if_present(path: &Path, sink: &EnvelopeSink) {
    match store::read_text(path) {
        Ok(content) if !content.is_empty() => sink.emit(Event::log(content)),
        Ok(_) => {}
        Err(e) => debug!(path = %path.display(), error = %e, "读取日志失败"),
    }
}

fn is_relevant(event: &notify::Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == file_name.as_os_str()))
}

fn watch_loop(
    rx: mpsc::Receiver<notify::Result<notify::Event>>,
    target: PathBuf,
    file_name: OsString,
    settle: Duration,
    stop: Arc<AtomicBool>,
    sink: EnvelopeSink,
) {
    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                if !is_relevant(&event, &file_name) {
                    continue;
                }
                std::thread::sleep(settle);
                // 稳定期内的后续通知合并为一次重读。
                while rx.try_recv().is_ok() {}
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                emit_if_present(&target, &sink);
            }
            Ok(Err(e)) => warn!(error = %e, "文件监视报告错误"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!(path = %target.display(), "日志监视线程退出");
}
