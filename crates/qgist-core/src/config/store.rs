//! Config store: the single accessor for the plugin manager's settings.
//!
//! # Lifecycle
//! `Uninitialized → Initialized (initialize) → Loaded (load / import_file /
//! restore_backup)`. Reads and writes of values require `Loaded`.
//!
//! # Guarantees
//! - Every key is checked against the [`Schema`]; every value against its field's rule.
//! - Validation runs before any mutation or write.
//! - `save()` rotates backups and replaces the live file, or leaves both untouched.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::backup::{parent_dir, Backup, BackupSet};
use super::group::{ConfigGroup, ConfigGroupMut};
use super::options::StoreOptions;
use super::packed::{pack_value, unpack_value};
use super::schema::{json_type_name, ConfigDocument, Schema, DELIMITER};
use crate::error::{ConfigError, Result, StoreState};

/// Validated, file-backed configuration document.
#[derive(Debug)]
pub struct ConfigStore {
    schema: Schema,
    options: StoreOptions,
    path: Option<PathBuf>,
    document: ConfigDocument,
    state: StoreState,
}

impl ConfigStore {
    /// Create an uninitialized store.
    pub fn new(schema: Schema, options: StoreOptions) -> Self {
        Self {
            schema,
            options,
            path: None,
            document: ConfigDocument::new(),
            state: StoreState::Uninitialized,
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// Backing file, once initialized.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Current document (empty before initialization).
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Raw mutable access that bypasses validation.
    ///
    /// Whatever is written here is checked again by `save()` and `export_file()`.
    pub fn document_mut(&mut self) -> Result<&mut ConfigDocument> {
        self.require(StoreState::Loaded, "document_mut")?;
        Ok(&mut self.document)
    }

    // ─────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────

    /// Bind the store to `path`.
    ///
    /// The parent must be an existing directory. An existing target must be a
    /// regular file; a missing one is created holding the schema defaults.
    pub fn initialize(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ConfigError::path(path, "path must not be empty"));
        }
        check_parent(path)?;

        let defaults = self.schema.defaults();
        if path.exists() {
            if !path.is_file() {
                return Err(ConfigError::path(path, "path must point to a regular file"));
            }
            debug!("Using existing config file {}", path.display());
        } else {
            self.write_document(path, &defaults)?;
            info!("Created config file {} with defaults", path.display());
        }

        self.path = Some(path.to_path_buf());
        self.document = defaults;
        self.state = StoreState::Initialized;
        Ok(())
    }

    /// Read and validate the backing file.
    pub fn load(&mut self) -> Result<()> {
        self.require(StoreState::Initialized, "load")?;
        let path = self.backing_path()?.to_path_buf();

        self.document = self.read_document(&path)?;
        self.state = StoreState::Loaded;
        debug!("Loaded {} field(s) from {}", self.document.len(), path.display());
        Ok(())
    }

    /// Validate the document and write it, rotating backups first.
    pub fn save(&self) -> Result<()> {
        self.require(StoreState::Loaded, "save")?;
        let path = self.backing_path()?;
        self.schema.validate_document(&self.document)?;

        self.write_document(path, &self.document)?;
        debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Replace the document with the content of `path`.
    ///
    /// The file is validated exactly like [`load`](Self::load); nothing is
    /// merged with the current state.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.require(StoreState::Initialized, "import_file")?;
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::path(path, "file does not exist"));
        }
        if !path.is_file() {
            return Err(ConfigError::path(path, "path must point to a regular file"));
        }

        self.document = self.read_document(path)?;
        self.state = StoreState::Loaded;
        info!("Imported configuration from {}", path.display());
        Ok(())
    }

    /// Write the validated document to `path`. No backups are made.
    pub fn export_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.require(StoreState::Loaded, "export_file")?;
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ConfigError::path(path, "path must not be empty"));
        }
        check_parent(path)?;
        if path.is_dir() {
            return Err(ConfigError::path(path, "path points to a directory"));
        }
        self.schema.validate_document(&self.document)?;

        let bytes = self.render(path, &self.document)?;
        fs::write(path, bytes).map_err(|e| ConfigError::io(path, e))?;
        info!("Exported configuration to {}", path.display());
        Ok(())
    }

    // ─────────────────────────────────────────
    // Values
    // ─────────────────────────────────────────

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.require(StoreState::Loaded, "get")?;
        if !self.schema.contains(name) {
            return Err(ConfigError::unknown_field(name));
        }
        self.document
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::Schema {
                key: Some(name.to_string()),
                reason: "field has no value".to_string(),
            })
    }

    /// Current value of `name`, or `default` when the field is known but unset.
    pub fn get_or(&self, name: &str, default: Value) -> Result<Value> {
        self.require(StoreState::Loaded, "get")?;
        if !self.schema.contains(name) {
            return Err(ConfigError::unknown_field(name));
        }
        Ok(self.document.get(name).cloned().unwrap_or(default))
    }

    /// Validate and store `value` under `name`.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        self.require(StoreState::Loaded, "set")?;
        self.schema.validate_entry(name, &value)?;
        self.document.insert(name.to_string(), value);
        Ok(())
    }

    /// Unpack the value of `name`, stored as a packed string.
    pub fn get_packed(&self, name: &str) -> Result<Value> {
        let value = self.get(name)?;
        let Some(data) = value.as_str() else {
            return Err(ConfigError::validation(
                name,
                format!("expected a packed string, found {}", json_type_name(&value)),
            ));
        };
        unpack_value(data).map_err(|e| e.for_key(name))
    }

    /// Pack `value` and store it under `name`.
    pub fn set_packed(&mut self, name: &str, value: &Value) -> Result<()> {
        let packed = pack_value(value).map_err(|e| e.for_key(name))?;
        self.set(name, Value::String(packed))
    }

    /// Drop the value of `name`. Exact fields fall back to their default.
    ///
    /// Returns the previous value, if any.
    pub fn remove(&mut self, name: &str) -> Result<Option<Value>> {
        self.require(StoreState::Loaded, "remove")?;
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| ConfigError::unknown_field(name))?;

        let previous = match field.default_value() {
            Some(default) if !field.is_pattern() => {
                self.document.insert(name.to_string(), default.clone())
            }
            _ => self.document.remove(name),
        };
        Ok(previous)
    }

    /// All keys currently holding a value, sorted.
    pub fn keys(&self) -> Result<impl Iterator<Item = &str> + '_> {
        self.require(StoreState::Loaded, "keys")?;
        Ok(self.document.keys().map(String::as_str))
    }

    /// Distinct first segments of all keys, sorted.
    pub fn keys_root(&self) -> Result<Vec<String>> {
        let roots: BTreeSet<&str> = self
            .keys()?
            .map(|key| key.split(DELIMITER).next().unwrap_or(key))
            .collect();
        Ok(roots.into_iter().map(str::to_string).collect())
    }

    /// Read-only view of the keys below `root`.
    pub fn group(&self, root: &str) -> Result<ConfigGroup<'_>> {
        ConfigGroup::new(self, root)
    }

    /// Read/write view of the keys below `root`.
    pub fn group_mut(&mut self, root: &str) -> Result<ConfigGroupMut<'_>> {
        ConfigGroupMut::new(self, root)
    }

    // ─────────────────────────────────────────
    // Backups
    // ─────────────────────────────────────────

    /// Backup chain of the backing file.
    pub fn backup_set(&self) -> Result<BackupSet> {
        self.require(StoreState::Initialized, "backup_set")?;
        Ok(BackupSet::new(
            self.backing_path()?,
            self.options.max_backups,
            self.options.rotation,
        ))
    }

    /// Existing backups, newest first.
    pub fn backups(&self) -> Result<Vec<Backup>> {
        self.backup_set()?.list()
    }

    /// Delete every backup of the backing file.
    pub fn prune_backups(&self) -> Result<usize> {
        self.backup_set()?.prune()
    }

    /// Replace the document with backup number `index`.
    ///
    /// The live file is only touched by the next `save()`.
    pub fn restore_backup(&mut self, index: usize) -> Result<()> {
        let path = self.backup_set()?.slot(index);
        if !path.is_file() {
            return Err(ConfigError::path(path, format!("backup {index} does not exist")));
        }

        self.document = self.read_document(&path)?;
        self.state = StoreState::Loaded;
        info!("Restored configuration from backup {}", path.display());
        Ok(())
    }

    // ─────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────

    fn require(&self, required: StoreState, operation: &'static str) -> Result<()> {
        if self.state < required {
            return Err(ConfigError::State {
                operation,
                required,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn backing_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or(ConfigError::State {
            operation: "access the backing file",
            required: StoreState::Initialized,
            actual: self.state,
        })
    }

    /// Parse and validate a JSON document; missing exact fields get their defaults.
    pub(crate) fn read_document(&self, path: &Path) -> Result<ConfigDocument> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::path(path, "file does not exist"),
            _ => ConfigError::io(path, e),
        })?;

        let raw: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Format {
            path: path.to_path_buf(),
            source,
        })?;

        let mut document: ConfigDocument = match raw {
            Value::Object(map) => map.into_iter().collect(),
            other => {
                return Err(ConfigError::Schema {
                    key: None,
                    reason: format!(
                        "configuration data must be an object, found {}",
                        json_type_name(&other)
                    ),
                });
            }
        };

        self.schema.validate_document(&document)?;
        for (key, value) in self.schema.defaults() {
            document.entry(key).or_insert(value);
        }
        Ok(document)
    }

    fn render(&self, path: &Path, document: &ConfigDocument) -> Result<Vec<u8>> {
        let indent = " ".repeat(self.options.indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        document
            .serialize(&mut serializer)
            .map_err(|source| ConfigError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Stage the rendered document next to `path`, then commit it through the backup chain.
    fn write_document(&self, path: &Path, document: &ConfigDocument) -> Result<()> {
        let bytes = self.render(path, document)?;
        let backups = BackupSet::new(path, self.options.max_backups, self.options.rotation);
        let staged = backups.staging_path();

        let result = write_synced(&staged, &bytes).and_then(|()| backups.commit(&staged));
        if result.is_err() && staged.exists() {
            if let Err(e) = fs::remove_file(&staged) {
                warn!("Failed to remove staged file {}: {}", staged.display(), e);
            }
        }
        result
    }
}

/// The parent of `path` must exist and be a directory.
fn check_parent(path: &Path) -> Result<()> {
    let parent = parent_dir(path);
    if !parent.exists() {
        return Err(ConfigError::path(path, "parent directory does not exist"));
    }
    if !parent.is_dir() {
        return Err(ConfigError::path(path, "parent is not a directory"));
    }
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| ConfigError::io(path, e))?;
    file.write_all(bytes).map_err(|e| ConfigError::io(path, e))?;
    file.sync_all().map_err(|e| ConfigError::io(path, e))?;
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
