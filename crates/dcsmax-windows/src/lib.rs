//! Windows 平台能力封装（注册表、进程、对话框、按键注入、路径探测等）。
//!
//! 目标：
//! - 将 Win32 细节与外部系统程序调用集中在本 crate，宿主只面对普通 Rust 函数
//! - 统一错误处理风格（以 `anyhow::Result` 形式向上返回）
//!
//! 平台说明：
//! - 非 Windows 目标上所有函数均可编译：探测类返回“未找到”，操作类返回错误
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

pub mod dialog;
pub mod elevation;
pub mod input;
pub mod probe;
pub mod process;
pub mod registry;
pub mod shell;
