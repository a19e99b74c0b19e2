//! Store options: backup limits and output formatting.
//!
//! # Precedence
//! 1. Defaults (from `StoreOptions::default()`)
//! 2. Environment variables `QGIST_<FIELD>` (override defaults)
//! 3. Explicit values set by the caller (e.g. CLI flags)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default number of numbered backups kept next to the config file.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Default JSON indentation, in spaces.
pub const DEFAULT_INDENT: usize = 4;

/// What `save()` does when every backup slot is occupied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rotation {
    /// Refuse to save ("too many old backups").
    #[default]
    Strict,
    /// Drop the oldest backup to make room.
    EvictOldest,
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rotation::Strict => f.write_str("strict"),
            Rotation::EvictOldest => f.write_str("evict"),
        }
    }
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Rotation::Strict),
            "evict" | "evict-oldest" | "evictoldest" => Ok(Rotation::EvictOldest),
            other => Err(format!("unknown rotation policy \"{other}\" (expected strict or evict)")),
        }
    }
}

/// Options for a [`ConfigStore`](super::ConfigStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreOptions {
    /// Maximum number of `<file>.bak.<n>` snapshots. `0` disables backups.
    pub max_backups: usize,
    /// Behaviour when all backup slots are occupied.
    pub rotation: Rotation,
    /// Spaces per indentation level in written JSON.
    pub indent: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_backups: DEFAULT_MAX_BACKUPS,
            rotation: Rotation::default(),
            indent: DEFAULT_INDENT,
        }
    }
}

impl StoreOptions {
    /// Defaults with environment overrides applied.
    ///
    /// Supported overrides:
    /// - `QGIST_MAX_BACKUPS` → `max_backups`
    /// - `QGIST_BACKUP_ROTATION` → `rotation` (`strict` | `evict`)
    pub fn from_env() -> Self {
        apply_overrides(Self::default(), |name| std::env::var(name).ok())
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Apply overrides read through `lookup`. Unparsable values are logged and ignored.
fn apply_overrides(mut options: StoreOptions, lookup: impl Fn(&str) -> Option<String>) -> StoreOptions {
    if let Some(val) = lookup("QGIST_MAX_BACKUPS") {
        match val.trim().parse::<usize>() {
            Ok(n) => options.max_backups = n,
            Err(e) => warn!("Ignoring QGIST_MAX_BACKUPS={val:?}: {e}"),
        }
    }
    if let Some(val) = lookup("QGIST_BACKUP_ROTATION") {
        match val.parse::<Rotation>() {
            Ok(rotation) => options.rotation = rotation,
            Err(e) => warn!("Ignoring QGIST_BACKUP_ROTATION: {e}"),
        }
    }
    options
}
