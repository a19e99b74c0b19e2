//! `qgist-config backups`: manage the numbered backups of the config file.
//!
//! - `qgist-config backups list`: show backups, newest first
//! - `qgist-config backups prune`: delete every backup
//! - `qgist-config backups restore <N>`: make backup N the live config

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Subcommand;
use colored::Colorize;

use crate::helpers::{self, print_ok, StoreArgs};

// ─────────────────────────────────────────────
// Subcommand enum
// ─────────────────────────────────────────────

/// Backup subcommands.
#[derive(Subcommand)]
pub enum BackupsCommands {
    /// List backups, newest first
    List,

    /// Delete every backup
    Prune,

    /// Restore backup N and save it as the live config
    Restore {
        /// Backup number (1 = newest)
        index: usize,
    },
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

/// Dispatch a backups subcommand.
pub fn dispatch(args: &StoreArgs, cmd: BackupsCommands) -> Result<()> {
    match cmd {
        BackupsCommands::List => list_backups(args),
        BackupsCommands::Prune => prune_backups(args),
        BackupsCommands::Restore { index } => restore_backup(args, index),
    }
}

/// Last modification time of `path`, formatted for display.
fn modified_at(path: &Path) -> String {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// `qgist-config backups list`
fn list_backups(args: &StoreArgs) -> Result<()> {
    let store = args.open()?;
    let backups = store.backups().context("failed to list backups")?;
    let limit = store.options().max_backups;

    println!();
    if backups.is_empty() {
        println!("  {}", "No backups.".dimmed());
        println!();
        return Ok(());
    }

    println!(
        "  {:<6} {:<21} {}",
        "#".bold(),
        "Modified".bold(),
        "Path".bold()
    );
    for backup in &backups {
        let index = if backup.index > limit {
            format!("{} (stale)", backup.index).yellow().to_string()
        } else {
            backup.index.to_string()
        };
        println!(
            "  {:<6} {:<21} {}",
            index,
            modified_at(&backup.path),
            backup.path.display()
        );
    }
    println!();
    println!(
        "  {}",
        format!(
            "{} of {} slots used ({} rotation)",
            backups.iter().filter(|b| b.index <= limit).count(),
            limit,
            store.options().rotation
        )
        .dimmed()
    );
    println!();
    Ok(())
}

/// `qgist-config backups prune`
fn prune_backups(args: &StoreArgs) -> Result<()> {
    let store = args.open()?;
    let removed = store.prune_backups().context("failed to prune backups")?;
    print_ok(&format!("removed {removed} backup(s)"));
    Ok(())
}

/// `qgist-config backups restore N`
fn restore_backup(args: &StoreArgs, index: usize) -> Result<()> {
    let mut store = args.open()?;
    store
        .restore_backup(index)
        .with_context(|| format!("cannot restore backup {index}"))?;
    helpers::save(&store)?;
    print_ok(&format!("restored backup {index}"));
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn restore_makes_backup_live() {
        let dir = tempfile::tempdir().unwrap();
        let args = StoreArgs {
            config: Some(dir.path().join("pluginmanager.json").display().to_string()),
            max_backups: Some(3),
            evict: false,
        };

        let mut store = args.open().unwrap();
        store
            .set("app/plugin_installer/allowDeprecated", json!(true))
            .unwrap();
        store.save().unwrap();

        // bak.1 holds the defaults written on first open
        restore_backup(&args, 1).unwrap();
        let store = args.open().unwrap();
        assert_eq!(
            store.get("app/plugin_installer/allowDeprecated").unwrap(),
            json!(false)
        );
        assert_eq!(store.backups().unwrap().len(), 2);
    }

    #[test]
    fn prune_empties_chain() {
        let dir = tempfile::tempdir().unwrap();
        let args = StoreArgs {
            config: Some(dir.path().join("pluginmanager.json").display().to_string()),
            max_backups: None,
            evict: true,
        };
        let store = args.open().unwrap();
        store.save().unwrap();
        prune_backups(&args).unwrap();
        assert!(args.open().unwrap().backups().unwrap().is_empty());
    }

    #[test]
    fn modified_at_of_missing_file() {
        assert_eq!(modified_at(Path::new("/nonexistent/file")), "unknown");
    }
}
