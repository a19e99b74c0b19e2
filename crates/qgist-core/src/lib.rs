//! QGIST core: the plugin manager's configuration store.
//!
//! - [`config`]: schema, validated load/save/import/export, backup rotation
//! - [`error`]: the [`ConfigError`] taxonomy
//! - [`utils`]: host path resolution and settings value helpers

pub mod config;
pub mod error;
pub mod utils;

pub use config::{ConfigStore, Schema, StoreOptions};
pub use error::{ConfigError, Result, StoreState};
