//! Error types for the configuration store.
//!
//! Every failure carries the path or field name it concerns, so callers can
//! turn it into a user-facing message without extra bookkeeping.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Lifecycle stage of a [`ConfigStore`](crate::config::ConfigStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreState {
    /// Constructed, no backing path yet.
    Uninitialized,
    /// Backing path validated (and created with defaults if it was missing).
    Initialized,
    /// A document has been loaded, imported or restored.
    Loaded,
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreState::Uninitialized => "uninitialized",
            StoreState::Initialized => "initialized",
            StoreState::Loaded => "loaded",
        };
        f.write_str(name)
    }
}

/// Error type for configuration store operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A path precondition (existence, file vs. directory) was violated.
    #[error("invalid path {}: {reason}", .path.display())]
    Path { path: PathBuf, reason: String },

    /// The file content is not valid JSON.
    #[error("{} does not contain valid JSON: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Unknown field, unset field, or a top level that is not an object.
    #[error("{}", describe_schema(.key.as_deref(), .reason))]
    Schema { key: Option<String>, reason: String },

    /// A value does not satisfy its field's validator.
    #[error("invalid value for \"{key}\": {reason}")]
    Validation { key: String, reason: String },

    /// Backup rotation could not make room for a new snapshot.
    #[error("could not back up {} before saving: {reason}", .path.display())]
    Backup { path: PathBuf, reason: String },

    /// An operation was invoked before the store reached the required stage.
    #[error("{operation} requires a {required} store, but it is {actual}")]
    State {
        operation: &'static str,
        required: StoreState,
        actual: StoreState,
    },

    /// A file system I/O error that is not a path precondition.
    #[error("I/O error accessing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_schema(key: Option<&str>, reason: &str) -> String {
    match key {
        Some(key) => format!("schema violation at \"{key}\": {reason}"),
        None => format!("schema violation: {reason}"),
    }
}

impl ConfigError {
    pub(crate) fn path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConfigError::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_field(key: &str) -> Self {
        ConfigError::Schema {
            key: Some(key.to_string()),
            reason: "unknown configuration field".to_string(),
        }
    }

    pub(crate) fn validation(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category name, used by callers that map errors to dialogs or exit codes.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::Path { .. } => "path",
            ConfigError::Format { .. } => "format",
            ConfigError::Schema { .. } => "schema",
            ConfigError::Validation { .. } => "validation",
            ConfigError::Backup { .. } => "backup",
            ConfigError::State { .. } => "state",
            ConfigError::Io { .. } => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
