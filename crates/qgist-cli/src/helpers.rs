//! Shared CLI helpers: store construction, path expansion, value parsing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use tracing::debug;

use qgist_core::config::{Rotation, Schema, StoreOptions, ValueRule};
use qgist_core::utils::{bool_to_str, default_config_path, str_to_bool, BoolStyle};
use qgist_core::{ConfigError, ConfigStore};

/// Options shared by every command that opens the store.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Config file (default: <QGIS profile>/python/qgist/pluginmanager.json)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Maximum number of numbered backups (overrides QGIST_MAX_BACKUPS)
    #[arg(long, global = true)]
    pub max_backups: Option<usize>,

    /// Evict the oldest backup instead of refusing to save when all slots are used
    #[arg(long, global = true, default_value_t = false)]
    pub evict: bool,
}

impl StoreArgs {
    /// Resolve the config file path.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(expand_tilde(path)),
            None => default_config_path().context("failed to resolve the default config directory"),
        }
    }

    /// Environment options with CLI flags applied on top.
    pub fn options(&self) -> StoreOptions {
        let mut options = StoreOptions::from_env();
        if let Some(max) = self.max_backups {
            options = options.with_max_backups(max);
        }
        if self.evict {
            options = options.with_rotation(Rotation::EvictOldest);
        }
        options
    }

    /// Open, initialize and load the plugin manager store.
    pub fn open(&self) -> Result<ConfigStore> {
        let path = self.config_path()?;
        let options = self.options();
        debug!(path = %path.display(), max_backups = options.max_backups, "opening config store");
        let mut store = ConfigStore::new(Schema::plugin_manager(), options);
        store
            .initialize(&path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        store
            .load()
            .with_context(|| format!("failed to load config {}", path.display()))?;
        Ok(store)
    }
}

/// Save, adding a hint when the backup chain is full.
pub fn save(store: &ConfigStore) -> Result<()> {
    match store.save() {
        Ok(()) => Ok(()),
        Err(e @ ConfigError::Backup { .. }) => Err(anyhow::Error::new(e)).context(
            "config not saved; run `qgist-config backups prune` or pass --evict",
        ),
        Err(e) => Err(e).context("failed to save config"),
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parse a command-line value for field `name`.
///
/// Text fields keep the raw argument even when it looks like JSON, and
/// textual flags (`"true"`/`"false"`) accept any boolean spelling.
pub fn parse_field_value(schema: &Schema, name: &str, raw: &str) -> Value {
    let parsed = parse_value(raw);
    let Some(ValueRule::Text { one_of, .. }) = schema.field(name).map(|f| f.rule()) else {
        return parsed;
    };
    let text = parsed.as_str().unwrap_or(raw);
    if one_of.as_deref().is_some_and(is_text_flag) {
        if let Ok(flag) = str_to_bool(text) {
            return Value::String(bool_to_str(flag, BoolStyle::Lowercase).to_string());
        }
    }
    Value::String(text.to_string())
}

fn is_text_flag(choices: &[String]) -> bool {
    choices.len() == 2 && choices.iter().all(|c| c == "true" || c == "false")
}

/// Render a value for terminal output.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

/// Print a green check line.
pub fn print_ok(message: &str) {
    println!("  {} {}", "✓".green(), message);
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
