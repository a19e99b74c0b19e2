//! Configuration system: schema, validated store, backups and settings groups.
//!
//! # Usage
//! ```no_run
//! use qgist_core::config::{ConfigStore, Schema, StoreOptions};
//!
//! let mut store = ConfigStore::new(Schema::plugin_manager(), StoreOptions::from_env());
//! store.initialize("/path/to/pluginmanager.json")?;
//! store.load()?;
//! store.set("app/plugin_installer/allowExperimental", serde_json::json!(true))?;
//! store.save()?;
//! # Ok::<(), qgist_core::ConfigError>(())
//! ```

pub mod backup;
pub mod group;
pub mod options;
pub mod packed;
pub mod schema;
pub mod store;

// Re-export key types
pub use backup::{Backup, BackupSet};
pub use group::{ConfigGroup, ConfigGroupMut};
pub use options::{Rotation, StoreOptions};
pub use packed::{pack_value, unpack_value, PackError};
pub use schema::{ConfigDocument, ConfigField, Schema, ValueRule};
pub use store::ConfigStore;
