//! DCS-Max 宿主进程（UI 桥接层）。
//!
//! 职责：
//! - 接收 UI 的请求信封并分发到各方法处理器，按 `id` 回送响应
//! - 运行外部脚本（同步捕获/逐行流式）并以事件形式推送输出
//! - 监视单个日志文件并推送完整内容
//! - 所有出站信封经由单一消费者写出，保证 UI 看到的顺序与交付顺序一致
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

pub mod args;
pub mod bridge;
pub mod context;
pub mod handlers;
pub mod runner;
pub mod sink;
pub mod transport;
pub mod watcher;
