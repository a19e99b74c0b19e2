//! `qgist-config status`: show config path, backup policy and current values.
//!
//! Never creates the config file.

use anyhow::Result;
use colored::Colorize;

use crate::helpers::{format_value, StoreArgs};

/// Run the status command.
pub fn run(args: &StoreArgs) -> Result<()> {
    let path = args.config_path()?;
    let config_exists = path.exists();

    println!();
    println!("{}", "QGIST Plugin Manager Config".cyan().bold());
    println!();

    // Config
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        if config_exists {
            "✓".green().to_string()
        } else {
            "(not created yet)".yellow().to_string()
        }
    );

    // Read-only: a missing file is reported, not created.
    if !config_exists {
        println!();
        println!("  {}", "Run `qgist-config set` or `import` to create it.".dimmed());
        println!();
        return Ok(());
    }
    let store = args.open()?;

    // Backups
    let options = store.options();
    let used = store.backups()?.len();
    println!(
        "  {:<18} {} of {} | rotation: {}",
        "Backups:".bold(),
        used,
        options.max_backups,
        format!("{}", options.rotation).dimmed(),
    );

    // Values
    println!();
    println!("  {}", "Values:".bold());
    let mut empty = true;
    for (key, value) in store.document() {
        empty = false;
        println!("    {:<50} {}", key, format_value(value).dimmed());
    }
    if empty {
        println!("    {}", "(none)".dimmed());
    }

    println!();

    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
