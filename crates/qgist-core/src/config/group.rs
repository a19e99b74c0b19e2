//! Settings groups: views of the store rooted at a key prefix.
//!
//! Mirrors the host's `beginGroup`/`endGroup` settings API without any
//! hidden state: a group is just a store reference plus a root, and every
//! access resolves `root/name` through the store's own validation.

use std::collections::BTreeSet;

use serde_json::Value;

use super::schema::DELIMITER;
use super::store::ConfigStore;
use crate::error::{ConfigError, Result};

/// Read-only group view.
#[derive(Debug)]
pub struct ConfigGroup<'a> {
    store: &'a ConfigStore,
    root: String,
}

/// Read/write group view.
#[derive(Debug)]
pub struct ConfigGroupMut<'a> {
    store: &'a mut ConfigStore,
    root: String,
}

impl<'a> ConfigGroup<'a> {
    pub(crate) fn new(store: &'a ConfigStore, root: &str) -> Result<Self> {
        check_root(root)?;
        Ok(Self {
            store,
            root: root.to_string(),
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Full key of `name` within this group.
    pub fn key(&self, name: &str) -> String {
        join(&self.root, name)
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        check_name(&self.root, name)?;
        self.store.get(&self.key(name))
    }

    pub fn get_or(&self, name: &str, default: Value) -> Result<Value> {
        check_name(&self.root, name)?;
        self.store.get_or(&self.key(name), default)
    }

    pub fn get_packed(&self, name: &str) -> Result<Value> {
        check_name(&self.root, name)?;
        self.store.get_packed(&self.key(name))
    }

    /// Nested group `root/name`.
    pub fn group(&self, name: &str) -> Result<ConfigGroup<'a>> {
        check_name(&self.root, name)?;
        ConfigGroup::new(self.store, &self.key(name))
    }

    /// Keys below the root, with the root prefix stripped.
    pub fn keys(&self) -> Result<Vec<String>> {
        scoped_keys(self.store, &self.root)
    }

    /// Distinct first segments below the root, sorted.
    pub fn keys_root(&self) -> Result<Vec<String>> {
        Ok(first_segments(self.keys()?))
    }
}

impl<'a> ConfigGroupMut<'a> {
    pub(crate) fn new(store: &'a mut ConfigStore, root: &str) -> Result<Self> {
        check_root(root)?;
        Ok(Self {
            store,
            root: root.to_string(),
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn key(&self, name: &str) -> String {
        join(&self.root, name)
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        check_name(&self.root, name)?;
        self.store.get(&self.key(name))
    }

    pub fn get_or(&self, name: &str, default: Value) -> Result<Value> {
        check_name(&self.root, name)?;
        self.store.get_or(&self.key(name), default)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        check_name(&self.root, name)?;
        let key = self.key(name);
        self.store.set(&key, value)
    }

    pub fn get_packed(&self, name: &str) -> Result<Value> {
        check_name(&self.root, name)?;
        self.store.get_packed(&self.key(name))
    }

    pub fn set_packed(&mut self, name: &str, value: &Value) -> Result<()> {
        check_name(&self.root, name)?;
        let key = self.key(name);
        self.store.set_packed(&key, value)
    }

    pub fn remove(&mut self, name: &str) -> Result<Option<Value>> {
        check_name(&self.root, name)?;
        let key = self.key(name);
        self.store.remove(&key)
    }

    /// Nested writable group `root/name`, borrowing this one.
    pub fn group_mut(&mut self, name: &str) -> Result<ConfigGroupMut<'_>> {
        check_name(&self.root, name)?;
        let root = self.key(name);
        ConfigGroupMut::new(&mut *self.store, &root)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        scoped_keys(self.store, &self.root)
    }

    pub fn keys_root(&self) -> Result<Vec<String>> {
        Ok(first_segments(self.keys()?))
    }
}

fn check_root(root: &str) -> Result<()> {
    if root.is_empty() {
        return Err(ConfigError::validation(root, "group root must not be empty"));
    }
    Ok(())
}

/// Empty names are reported against the group root.
fn check_name(root: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConfigError::validation(root, "group member name must not be empty"));
    }
    Ok(())
}

fn join(root: &str, name: &str) -> String {
    format!("{root}{DELIMITER}{name}")
}

fn scoped_keys(store: &ConfigStore, root: &str) -> Result<Vec<String>> {
    let base = format!("{root}{DELIMITER}");
    Ok(store
        .keys()?
        .filter_map(|key| key.strip_prefix(&base))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
        .collect())
}

fn first_segments(keys: Vec<String>) -> Vec<String> {
    let roots: BTreeSet<String> = keys
        .into_iter()
        .filter_map(|key| key.split(DELIMITER).next().map(str::to_string))
        .collect();
    roots.into_iter().collect()
}
