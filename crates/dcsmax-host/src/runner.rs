//! 外部进程运行器（同步捕获 / 逐行流式）。
//!
//! 职责：
//! - 按脚本扩展名选择解释器（`.reg` / `.ahk` / `.bat` `.cmd` / 其余走 PowerShell `-File`）
//! - 同步模式：等待退出后一次性返回退出码与完整输出
//! - 流式模式：每读到一行就推送 `scriptOutput`，退出后推送一次 `scriptComplete`
//! - 单会话槽：同一时刻只有一个流式子进程，新会话会先强制结束旧会话
//!
//! 注意：
//! - 子进程没有超时控制，挂起的脚本会一直占用会话槽，直到 `stopScript`
//! - 被 `stopScript` 结束的会话不再推送 `scriptComplete`
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use dcsmax_core::config::Interpreters;
use dcsmax_core::ipc::{Event, OutputStream};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::sink::EnvelopeSink;

/// 一次进程启动的完整描述。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Launch {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: Option<&Path>) -> Self {
        self.working_dir = dir.map(Path::to_path_buf);
        self
    }
}

/// 流式脚本的启动计划。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptPlan {
    Direct(Launch),
    /// AutoHotkey 脚本：启动前需要先输出解释器信息并检查脚本是否存在。
    AutoHotkey {
        interpreter: String,
        script: PathBuf,
        launch: Launch,
    },
}

/// PowerShell `-File` 运行脚本，工作目录为脚本所在目录。
pub fn powershell_file(interp: &Interpreters, script: &Path, args: &[String]) -> Launch {
    Launch::new(&interp.powershell)
        .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"])
        .arg(script.to_string_lossy())
        .args(args.iter().cloned())
        .current_dir(script.parent())
}

/// PowerShell `-Command` 执行一条命令。
///
/// 命令作为单个参数传入；内嵌的双引号由命令行转义规则处理为 `\"`。
pub fn powershell_command(interp: &Interpreters, command: &str) -> Launch {
    Launch::new(&interp.powershell)
        .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"])
        .arg(command)
}

/// 按扩展名为流式执行选择解释器。
///
/// 参数：
/// - `interp`：解释器配置
/// - `script`：已解析到项目根下的脚本路径
/// - `args`：脚本参数（逐个作为独立参数传递）
/// - `autohotkey`：仅在 `.ahk` 时调用，返回 AutoHotkey 可执行文件
pub fn plan_script(
    interp: &Interpreters,
    script: &Path,
    args: &[String],
    autohotkey: impl FnOnce() -> String,
) -> ScriptPlan {
    let ext = script
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let dir = script.parent();
    let path = script.to_string_lossy().into_owned();
    match ext.as_str() {
        "reg" => ScriptPlan::Direct(Launch::new(&interp.reg).arg("import").arg(path).current_dir(dir)),
        "ahk" => {
            let interpreter = autohotkey();
            let launch = Launch::new(&interpreter)
                .arg(path)
                .args(args.iter().cloned())
                .current_dir(dir);
            ScriptPlan::AutoHotkey {
                interpreter,
                script: script.to_path_buf(),
                launch,
            }
        }
        "bat" | "cmd" => ScriptPlan::Direct(
            Launch::new(&interp.cmd)
                .arg("/c")
                .arg(path)
                .args(args.iter().cloned())
                .current_dir(dir),
        ),
        _ => ScriptPlan::Direct(powershell_file(interp, script, args)),
    }
}

/// 同步执行结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// 同步运行并捕获输出（阻塞，须在阻塞线程池中调用）。
///
/// 异常处理：
/// - 启动失败返回错误，消息即系统错误文本
/// - 非零退出码不是错误，由调用方按 `code` 判断
pub fn run_captured(launch: &Launch) -> Result<Captured> {
    let mut cmd = std::process::Command::new(&launch.program);
    cmd.args(&launch.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &launch.working_dir {
        cmd.current_dir(dir);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(dcsmax_windows::process::CREATE_NO_WINDOW);
    }
    debug!(program = %launch.program, args = ?launch.args, "同步执行进程");
    let out = cmd.output().map_err(anyhow::Error::new)?;
    Ok(Captured {
        code: out.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
    })
}

fn spawn_streamed(launch: &Launch) -> std::io::Result<tokio::process::Child> {
    let mut cmd = tokio::process::Command::new(&launch.program);
    cmd.args(&launch.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &launch.working_dir {
        cmd.current_dir(dir);
    }
    #[cfg(windows)]
    cmd.creation_flags(dcsmax_windows::process::CREATE_NO_WINDOW);
    cmd.spawn()
}

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    cancel: Option<oneshot::Sender<()>>,
}

/// 流式脚本的单会话槽。
///
/// 说明：
/// - `start` 会先结束上一个会话（若仍在运行）
/// - 会话自然结束后自动清空槽位；被替换的旧会话不会清掉新会话
#[derive(Debug, Clone, Default)]
pub struct ScriptSlot {
    state: Arc<Mutex<SlotState>>,
}

impl ScriptSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 启动一个流式会话（须在 Tokio runtime 内调用）。
    pub fn start(&self, plan: ScriptPlan, sink: EnvelopeSink) {
        let (tx, rx) = oneshot::channel();
        let generation = {
            let mut state = self.lock();
            if let Some(prev) = state.cancel.take() {
                info!("新的流式脚本替换了仍在运行的会话");
                let _ = prev.send(());
            }
            state.generation += 1;
            state.cancel = Some(tx);
            state.generation
        };
        let slot = self.clone();
        tokio::spawn(async move {
            run_session(plan, sink, rx).await;
            slot.finish(generation);
        });
    }

    /// 强制结束当前会话；没有会话时返回 `false`。
    pub fn stop(&self) -> bool {
        match self.lock().cancel.take() {
            Some(cancel) => {
                let _ = cancel.send(());
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().cancel.is_some()
    }

    fn finish(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation {
            state.cancel = None;
        }
    }
}

async fn run_session(plan: ScriptPlan, sink: EnvelopeSink, cancel: oneshot::Receiver<()>) {
    let launch = match plan {
        ScriptPlan::Direct(launch) => launch,
        ScriptPlan::AutoHotkey {
            interpreter,
            script,
            launch,
        } => {
            sink.emit(Event::stdout(format!("Using AutoHotkey: {interpreter}")));
            sink.emit(Event::stdout(format!("Script: {}", script.display())));
            if !script.is_file() {
                warn!(script = %script.display(), "AutoHotkey 脚本不存在");
                sink.emit(Event::stderr(format!(
                    "ERROR: Script file not found: {}",
                    script.display()
                )));
                sink.emit(Event::complete(1, "", "Script not found"));
                return;
            }
            launch
        }
    };

    let mut child = match spawn_streamed(&launch) {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %launch.program, error = %e, "启动流式脚本失败");
            let message = e.to_string();
            sink.emit(Event::stderr(format!("ERROR: {message}")));
            sink.emit(Event::complete(-1, "", message));
            return;
        }
    };
    info!(program = %launch.program, pid = ?child.id(), "流式脚本已启动");

    let out_pump = child
        .stdout
        .take()
        .map(|r| tokio::spawn(pump(r, OutputStream::Stdout, sink.clone())));
    let err_pump = child
        .stderr
        .take()
        .map(|r| tokio::spawn(pump(r, OutputStream::Stderr, sink.clone())));

    tokio::select! {
        status = child.wait() => {
            let code = match status {
                Ok(s) => s.code().unwrap_or(-1),
                Err(e) => {
                    warn!(error = %e, "等待流式脚本退出失败");
                    -1
                }
            };
            let stdout = collect(out_pump).await;
            let stderr = collect(err_pump).await;
            info!(code, "流式脚本已退出");
            sink.emit(Event::complete(code, stdout, stderr));
        }
        _ = cancel => {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "结束流式脚本失败（可能已退出）");
            }
            let _ = child.wait().await;
            for pump in [out_pump, err_pump].into_iter().flatten() {
                pump.abort();
            }
            info!("流式脚本已被强制结束");
        }
    }
}

/// 把输出字节切成行：`\n`、`\r\n` 与单独的 `\r` 都算换行。
#[derive(Default)]
struct LineSplitter {
    partial: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in chunk {
            let after_cr = std::mem::replace(&mut self.after_cr, false);
            match b {
                b'\n' if after_cr => {}
                b'\n' => lines.push(self.take()),
                b'\r' => {
                    lines.push(self.take());
                    self.after_cr = true;
                }
                _ => self.partial.push(b),
            }
        }
        lines
    }

    fn finish(mut self) -> Option<String> {
        (!self.partial.is_empty()).then(|| self.take())
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        line
    }
}

/// 逐行读取一个输出流：每行推送一次事件，同时累积完整文本。
async fn pump<R>(mut reader: R, stream: OutputStream, sink: EnvelopeSink) -> String
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::default();
    let mut buf = [0u8; 4096];
    let mut all = String::new();
    let mut deliver = |line: String| {
        all.push_str(&line);
        all.push('\n');
        sink.emit(Event::output(stream, line));
    };
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => splitter.push(&buf[..n]).into_iter().for_each(&mut deliver),
            Err(e) => {
                debug!(error = %e, "读取子进程输出中断");
                break;
            }
        }
    }
    if let Some(rest) = splitter.finish() {
        deliver(rest);
    }
    all
}

async fn collect(pump: Option<JoinHandle<String>>) -> String {
    match pump {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// 供处理器在阻塞线程中同步执行 PowerShell 命令。
pub fn run_powershell(interp: &Interpreters, command: &str) -> Result<Captured> {
    run_captured(&powershell_command(interp, command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interpreters {
        Interpreters::default()
    }

    #[test]
    fn splitter_breaks_on_cr_lf_and_crlf() {
        let mut splitter = LineSplitter::default();
        let mut lines = splitter.push(b"one\r\ntwo\rthree\n10%\r20%");
        // `\r\n` 跨越两次读取仍算一个换行。
        lines.extend(splitter.push(b"\r"));
        lines.extend(splitter.push(b"\nlast"));
        lines.extend(splitter.finish());
        assert_eq!(lines, ["one", "two", "three", "10%", "20%", "last"]);
    }

    #[test]
    fn splitter_keeps_empty_lines_and_decodes_lossily() {
        let mut splitter = LineSplitter::default();
        let lines = splitter.push(b"\n\xffok\n");
        assert_eq!(lines, ["", "\u{fffd}ok"]);
        assert!(splitter.finish().is_none());
    }

    #[test]
    fn plans_follow_extension() {
        let args = vec!["-NoPause".to_string()];
        let dir = Path::new("/proj/scripts");

        match plan_script(&interp(), &dir.join("fix.REG"), &args, || unreachable!()) {
            ScriptPlan::Direct(l) => {
                assert_eq!(l.program, "reg.exe");
                assert_eq!(l.args[0], "import");
                assert_eq!(l.args.len(), 2);
            }
            other => panic!("unexpected plan: {other:?}"),
        }

        match plan_script(&interp(), &dir.join("run.cmd"), &args, || unreachable!()) {
            ScriptPlan::Direct(l) => {
                assert_eq!(l.program, "cmd.exe");
                assert_eq!(l.args[0], "/c");
                assert_eq!(l.args.last().map(String::as_str), Some("-NoPause"));
            }
            other => panic!("unexpected plan: {other:?}"),
        }

        match plan_script(&interp(), &dir.join("backup.ps1"), &args, || unreachable!()) {
            ScriptPlan::Direct(l) => {
                assert_eq!(l.program, "powershell.exe");
                assert_eq!(&l.args[..4], ["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"]);
                assert_eq!(l.working_dir.as_deref(), Some(dir));
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn autohotkey_plan_keeps_args_separate() {
        let args = vec!["--close-apps".to_string(), "--mission=C:\\m.miz".to_string()];
        let plan = plan_script(&interp(), Path::new("/proj/bench.ahk"), &args, || "ahk.exe".to_string());
        let ScriptPlan::AutoHotkey { interpreter, launch, .. } = plan else {
            panic!("expected AutoHotkey plan");
        };
        assert_eq!(interpreter, "ahk.exe");
        assert_eq!(launch.args.len(), 3);
        assert_eq!(launch.args[1], "--close-apps");
    }

    #[test]
    fn command_is_a_single_argument() {
        let l = powershell_command(&interp(), r#"Write-Output "hi""#);
        assert_eq!(l.args.last().map(String::as_str), Some(r#"Write-Output "hi""#));
        assert!(l.working_dir.is_none());
    }

    #[test]
    fn missing_program_is_an_error() {
        let launch = Launch::new("dcsmax-definitely-not-a-program");
        assert!(run_captured(&launch).is_err());
    }

    #[test]
    fn stopping_an_empty_slot_is_a_no_op() {
        let slot = ScriptSlot::new();
        assert!(!slot.stop());
        assert!(!slot.stop());
        assert!(!slot.is_active());
    }
}
