//! 注册表只读访问（工具安装路径探测）。
//!
//! 权限要求：
//! - 只读取 HKLM/HKCU 下的普通键，通常不需要管理员
//!
//! 作者：DCS-Max 项目组
//! 创建时间：2026-10-16
//! 修改时间：2026-10-16

use anyhow::Result;

/// 注册表根键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    LocalMachine,
    CurrentUser,
}

impl Hive {
    pub fn name(self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKLM",
            Hive::CurrentUser => "HKCU",
        }
    }
}

/// 读取字符串值（`value` 为空字符串表示默认值）。
///
/// 异常处理：
/// - 键不存在、值类型不是字符串或权限不足时返回错误
/// - 非 Windows 平台始终返回错误
#[cfg(windows)]
pub fn read_string(hive: Hive, key: &str, value: &str) -> Result<String> {
    use anyhow::Context;
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
    use winreg::RegKey;

    let root = match hive {
        Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
    };
    let sub = root
        .open_subkey(key)
        .with_context(|| format!("打开注册表键失败: {}\\{}", hive.name(), key))?;
    let v: String = sub
        .get_value(value)
        .with_context(|| format!("读取字符串值失败: {}\\{}\\{}", hive.name(), key, value))?;
    Ok(v)
}

#[cfg(not(windows))]
pub fn read_string(hive: Hive, key: &str, _value: &str) -> Result<String> {
    Err(anyhow::anyhow!("当前平台不支持注册表: {}\\{}", hive.name(), key))
}
