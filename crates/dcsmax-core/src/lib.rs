//! DCS-Max 宿主核心库（跨平台/与 UI 无关）。
//!
//! 功能：
//! - 定义 UI 与宿主之间的请求/响应/事件信封（单行一条 JSON）
//! - 定义方法目录与统一的 `{success, error, ...}` 结果载荷
//! - 项目根目录探测、相对路径解析与宿主配置（dcs-max-host.json）
//! - 配置文件格式：宽松 INI、优化开关清单（制表符分隔）、DCS `options.lua`
//! - 备份目录枚举与工具路径探测结果模型
//!
//! 约定：
//! - 本库不启动进程、不访问注册表；平台相关能力位于 `dcsmax-windows`
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

pub mod backups;
pub mod config;
pub mod detect;
pub mod error;
pub mod ini;
pub mod ipc;
pub mod options_lua;
pub mod paths;
pub mod reply;
pub mod settings;
pub mod store;
pub mod toggles;
