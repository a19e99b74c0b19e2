//! qgist-config: inspect and edit the QGIST plugin manager configuration.
//!
//! # Commands
//!
//! - `qgist-config status`: config path, backup policy and current values
//! - `qgist-config fields`: the schema: every known field and its rule
//! - `qgist-config get NAME` / `set NAME VALUE`: read or change one field
//!   (`--unpack` / `--pack` for packed values such as repository caches)
//! - `qgist-config import FILE` / `export FILE`: replace or dump the whole document
//! - `qgist-config backups list|prune|restore N`: manage numbered backups

mod backups_cmd;
mod helpers;
mod status;
mod values_cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};

use helpers::StoreArgs;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// QGIST plugin manager configuration tool
#[derive(Parser)]
#[command(name = "qgist-config", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show config path, backup policy and current values
    Status,

    /// List every known field with its rule and default
    Fields,

    /// Print the value of a field
    Get {
        /// Field name, e.g. "app/plugin_installer/allowExperimental"
        name: String,

        /// Decode a packed value (e.g. a repository cache)
        #[arg(long, default_value_t = false)]
        unpack: bool,
    },

    /// Validate, set and save a field
    Set {
        /// Field name
        name: String,

        /// New value as JSON (plain text is taken as a string)
        value: String,

        /// Store the JSON value packed
        #[arg(long, default_value_t = false)]
        pack: bool,
    },

    /// Remove a field's value (fields with a default are reset to it)
    Unset {
        /// Field name
        name: String,
    },

    /// Replace the whole configuration with a JSON file, then save
    Import {
        /// File to import
        file: String,
    },

    /// Write the configuration to a JSON file
    Export {
        /// Destination file
        file: String,
    },

    /// Manage numbered backups
    Backups {
        #[command(subcommand)]
        action: backups_cmd::BackupsCommands,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    match cli.command {
        Commands::Status => status::run(&cli.store),
        Commands::Fields => values_cmd::list_fields(),
        Commands::Get { name, unpack } => values_cmd::get(&cli.store, &name, unpack),
        Commands::Set { name, value, pack } => values_cmd::set(&cli.store, &name, &value, pack),
        Commands::Unset { name } => values_cmd::unset(&cli.store, &name),
        Commands::Import { file } => values_cmd::import(&cli.store, &file),
        Commands::Export { file } => values_cmd::export(&cli.store, &file),
        Commands::Backups { action } => backups_cmd::dispatch(&cli.store, action),
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("qgist_core=debug,qgist_config=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
