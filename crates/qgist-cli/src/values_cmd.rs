//! `qgist-config get|set|unset|fields|import|export`: field and document commands.

use anyhow::{Context, Result};
use colored::Colorize;

use qgist_core::config::Schema;

use crate::helpers::{self, format_value, parse_field_value, parse_value, print_ok, StoreArgs};

/// `qgist-config fields`
pub fn list_fields() -> Result<()> {
    let schema = Schema::plugin_manager();

    println!();
    println!("{}", "Known fields".cyan().bold());
    println!();
    for field in schema.fields() {
        let default = field
            .default_value()
            .map(|v| format!("default {}", format_value(v)))
            .unwrap_or_default();
        println!("  {}", field.name().bold());
        println!(
            "      {}  {}",
            field.rule().describe().dimmed(),
            default.dimmed()
        );
        if !field.description().is_empty() {
            println!("      {}", field.description());
        }
    }
    println!();
    Ok(())
}

/// `qgist-config get NAME [--unpack]`
pub fn get(args: &StoreArgs, name: &str, unpack: bool) -> Result<()> {
    let store = args.open()?;
    let value = if unpack {
        store.get_packed(name)
    } else {
        store.get(name)
    }
    .with_context(|| format!("cannot read \"{name}\""))?;
    println!("{}", format_value(&value));
    Ok(())
}

/// `qgist-config set NAME VALUE [--pack]`
pub fn set(args: &StoreArgs, name: &str, raw: &str, pack: bool) -> Result<()> {
    let mut store = args.open()?;
    let result = if pack {
        store.set_packed(name, &parse_value(raw))
    } else {
        let value = parse_field_value(store.schema(), name, raw);
        store.set(name, value)
    };
    result.with_context(|| format!("cannot set \"{name}\""))?;
    helpers::save(&store)?;
    if pack {
        print_ok(&format!("{name} packed"));
    } else {
        print_ok(&format!("{name} = {}", format_value(&store.get(name)?)));
    }
    Ok(())
}

/// `qgist-config unset NAME`
pub fn unset(args: &StoreArgs, name: &str) -> Result<()> {
    let mut store = args.open()?;
    let previous = store
        .remove(name)
        .with_context(|| format!("cannot unset \"{name}\""))?;
    helpers::save(&store)?;
    match previous {
        Some(value) => print_ok(&format!("{name} cleared (was {})", format_value(&value))),
        None => print_ok(&format!("{name} had no value")),
    }
    Ok(())
}

/// `qgist-config import FILE`
pub fn import(args: &StoreArgs, file: &str) -> Result<()> {
    let mut store = args.open()?;
    let source = helpers::expand_tilde(file);
    store
        .import_file(&source)
        .with_context(|| format!("cannot import {}", source.display()))?;
    helpers::save(&store)?;
    print_ok(&format!(
        "imported {} field(s) from {}",
        store.document().len(),
        source.display()
    ));
    Ok(())
}

/// `qgist-config export FILE`
pub fn export(args: &StoreArgs, file: &str) -> Result<()> {
    let store = args.open()?;
    let target = helpers::expand_tilde(file);
    store
        .export_file(&target)
        .with_context(|| format!("cannot export to {}", target.display()))?;
    print_ok(&format!("exported configuration to {}", target.display()));
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
