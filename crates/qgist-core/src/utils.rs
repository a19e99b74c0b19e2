//! Utility helpers: host path resolution and settings value conversion.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ConfigError, Result};

/// File name of the plugin manager's configuration.
pub const CONFIG_FILE_NAME: &str = "pluginmanager.json";

/// Folder below the host settings root that holds plugin configuration.
pub const PLUGIN_CONFIG_DIR_NAME: &str = "python";

/// Folder below [`PLUGIN_CONFIG_DIR_NAME`] that holds QGIST configuration.
pub const CONFIG_DIR_NAME: &str = "qgist";

/// Host profile directory (e.g. `~/.local/share/QGIS/QGIS3/profiles/default`).
pub fn default_settings_root() -> PathBuf {
    let data = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("QGIS").join("QGIS3").join("profiles").join("default")
}

/// Ensure `<settings_root>/python/qgist` exists and return it.
///
/// Both folders are created on demand. `settings_root` itself is never
/// created: a missing host profile means the host is not installed or points
/// elsewhere.
pub fn resolve_config_dir(settings_root: &Path) -> Result<PathBuf> {
    if !settings_root.exists() {
        return Err(ConfigError::path(settings_root, "host settings path does not exist"));
    }
    if !settings_root.is_dir() {
        return Err(ConfigError::path(
            settings_root,
            "host settings path does not point to a directory",
        ));
    }

    let plugin_dir = ensure_dir(
        settings_root.join(PLUGIN_CONFIG_DIR_NAME),
        "plugin configuration path exists but is not a directory",
    )?;
    ensure_dir(
        plugin_dir.join(CONFIG_DIR_NAME),
        "configuration path exists but is not a directory",
    )
}

/// Create `dir` unless it exists; fail with `not_a_dir` if it is something else.
fn ensure_dir(dir: PathBuf, not_a_dir: &str) -> Result<PathBuf> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ConfigError::path(&dir, not_a_dir));
        }
    } else {
        fs::create_dir(&dir).map_err(|e| ConfigError::io(&dir, e))?;
        info!("Created configuration directory {}", dir.display());
    }
    Ok(dir)
}

/// Default config file: `<default settings root>/python/qgist/pluginmanager.json`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(resolve_config_dir(&default_settings_root())?.join(CONFIG_FILE_NAME))
}

// ─────────────────────────────────────────────
// Boolean settings
// ─────────────────────────────────────────────

/// Textual boolean styles found in host settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoolStyle {
    /// `True` / `False`
    TrueFalse,
    /// `true` / `false`
    Lowercase,
    /// `Yes` / `No`
    YesNo,
    /// `yes` / `no`
    Yesno,
    /// `1` / `0`
    Digit,
}

impl fmt::Display for BoolStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(bool_to_str(true, *self))?;
        f.write_str("/")?;
        f.write_str(bool_to_str(false, *self))
    }
}

/// Parse a textual boolean.
///
/// Exact matches (`yes`, `true`, `1`, `no`, `false`, `0`, any case) first,
/// then prefixes such as `trueish` or `nope`.
pub fn str_to_bool(text: &str) -> Result<bool> {
    let lower = text.trim().to_lowercase();
    match lower.as_str() {
        "yes" | "true" | "1" => return Ok(true),
        "no" | "false" | "0" => return Ok(false),
        _ => {}
    }
    if ["yes", "true"].iter().any(|p| lower.starts_with(p)) {
        return Ok(true);
    }
    if ["no", "false"].iter().any(|p| lower.starts_with(p)) {
        return Ok(false);
    }
    Err(ConfigError::validation(
        text,
        "value can not be converted to a boolean",
    ))
}

/// Render a boolean in the given style.
pub fn bool_to_str(value: bool, style: BoolStyle) -> &'static str {
    match (style, value) {
        (BoolStyle::TrueFalse, true) => "True",
        (BoolStyle::TrueFalse, false) => "False",
        (BoolStyle::Lowercase, true) => "true",
        (BoolStyle::Lowercase, false) => "false",
        (BoolStyle::YesNo, true) => "Yes",
        (BoolStyle::YesNo, false) => "No",
        (BoolStyle::Yesno, true) => "yes",
        (BoolStyle::Yesno, false) => "no",
        (BoolStyle::Digit, true) => "1",
        (BoolStyle::Digit, false) => "0",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_bool_exact() {
        assert!(str_to_bool("TRUE").unwrap());
        assert!(str_to_bool("yes").unwrap());
        assert!(str_to_bool("1").unwrap());
        assert!(!str_to_bool("False").unwrap());
        assert!(!str_to_bool(" no ").unwrap());
        assert!(!str_to_bool("0").unwrap());
    }

    #[test]
    fn test_str_to_bool_prefixes() {
        assert!(str_to_bool("yessir").unwrap());
        assert!(str_to_bool("true-ish").unwrap());
        assert!(!str_to_bool("nope").unwrap());
        assert!(!str_to_bool("falsy").unwrap());
    }

    #[test]
    fn test_str_to_bool_rejects_garbage() {
        let err = str_to_bool("maybe").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(str_to_bool("").is_err());
    }

    #[test]
    fn test_bool_to_str_styles() {
        assert_eq!(bool_to_str(true, BoolStyle::TrueFalse), "True");
        assert_eq!(bool_to_str(false, BoolStyle::Lowercase), "false");
        assert_eq!(bool_to_str(true, BoolStyle::YesNo), "Yes");
        assert_eq!(bool_to_str(false, BoolStyle::Yesno), "no");
        assert_eq!(bool_to_str(true, BoolStyle::Digit), "1");
        assert_eq!(BoolStyle::Digit.to_string(), "1/0");
    }

    #[test]
    fn test_bool_round_trip_through_text() {
        for style in [
            BoolStyle::TrueFalse,
            BoolStyle::Lowercase,
            BoolStyle::YesNo,
            BoolStyle::Yesno,
            BoolStyle::Digit,
        ] {
            for value in [true, false] {
                assert_eq!(str_to_bool(bool_to_str(value, style)).unwrap(), value);
            }
        }
    }

    #[test]
    fn test_resolve_config_dir_creates_nested_folders() {
        let root = tempfile::tempdir().unwrap();
        let dir = resolve_config_dir(root.path()).unwrap();
        assert_eq!(dir, root.path().join("python").join("qgist"));
        assert!(dir.is_dir());
        // Idempotent
        assert_eq!(resolve_config_dir(root.path()).unwrap(), dir);
    }

    #[test]
    fn test_resolve_config_dir_keeps_existing_plugin_folder() {
        let root = tempfile::tempdir().unwrap();
        let plugins = root.path().join("python");
        fs::create_dir(&plugins).unwrap();
        fs::write(plugins.join("other.txt"), "x").unwrap();

        let dir = resolve_config_dir(root.path()).unwrap();
        assert_eq!(dir, plugins.join("qgist"));
        assert!(plugins.join("other.txt").exists());
    }

    #[test]
    fn test_resolve_config_dir_errors() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing");
        assert!(matches!(
            resolve_config_dir(&missing),
            Err(ConfigError::Path { .. })
        ));

        let file = root.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(matches!(resolve_config_dir(&file), Err(ConfigError::Path { .. })));

        fs::write(root.path().join("python"), "x").unwrap();
        let err = resolve_config_dir(root.path()).unwrap_err();
        assert!(err.to_string().contains("plugin configuration path"));

        let other = tempfile::tempdir().unwrap();
        fs::create_dir(other.path().join("python")).unwrap();
        fs::write(other.path().join("python").join("qgist"), "x").unwrap();
        let err = resolve_config_dir(other.path()).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
        assert!(!err.to_string().contains("plugin configuration"));
    }

    #[test]
    fn test_default_settings_root_layout() {
        let root = default_settings_root();
        assert!(root.ends_with("QGIS/QGIS3/profiles/default"));
    }
}
