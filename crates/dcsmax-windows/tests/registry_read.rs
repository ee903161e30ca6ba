#![cfg(windows)]

use uuid::Uuid;
use winreg::enums::HKEY_CURRENT_USER;
use winreg::RegKey;

use dcsmax_windows::registry::{read_string, Hive};

#[test]
fn reads_named_and_default_string_values_from_hkcu() {
    let (key_path, _guard) = create_test_key();

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _disp) = hkcu.create_subkey(&key_path).expect("create subkey");
    key.set_value("Path", &"D:\\Games\\DCS World").expect("set named value");
    key.set_value("", &"D:\\Default").expect("set default value");

    assert_eq!(read_string(Hive::CurrentUser, &key_path, "Path").unwrap(), "D:\\Games\\DCS World");
    assert_eq!(read_string(Hive::CurrentUser, &key_path, "").unwrap(), "D:\\Default");
    assert!(read_string(Hive::CurrentUser, &key_path, "Missing").is_err());
}

#[test]
fn missing_key_is_an_error() {
    let path = format!("Software\\DcsMaxTest\\{}", Uuid::new_v4());
    assert!(read_string(Hive::CurrentUser, &path, "Path").is_err());
}

fn create_test_key() -> (String, CleanupKey) {
    let path = format!("Software\\DcsMaxTest\\{}", Uuid::new_v4());
    (path.clone(), CleanupKey(path))
}

struct CleanupKey(String);

impl Drop for CleanupKey {
    fn drop(&mut self) {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let _ = hkcu.delete_subkey_all(&self.0);
    }
}
