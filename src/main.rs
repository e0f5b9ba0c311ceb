//! # picsync CLI
//!
//! Commands for rehosting Markdown images and inspecting store capacity.
//!
//! ## Usage
//!
//! ```bash
//! picsync --config ./picsync.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `picsync sync` | Process all changed documents |
//! | `picsync sync --dry-run` | Report planned actions without mutating anything |
//! | `picsync sync --force` | Ignore fingerprints, reprocess every document |
//! | `picsync status` | Report per-store usage against the watermarks |
//!
//! The store API token is read from the environment variable named by
//! `stores.token_env` in the config (default `PICSYNC_TOKEN`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use picsync::{config, status, sync};

/// picsync — rehost external Markdown images to GitHub-backed image
/// repositories.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file listing the store repos, the directories to scan, and limits.
#[derive(Parser)]
#[command(
    name = "picsync",
    about = "Rehost external images referenced from Markdown notes into GitHub-backed image repositories",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./picsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan configured folders and rehost external images.
    ///
    /// Documents whose fingerprint matches the ledger are skipped. For
    /// each dirty document, external image references are uploaded to the
    /// active store (at most once per distinct URL, ever) and rewritten
    /// in place. The ledger snapshot is persisted after every completed
    /// document.
    Sync {
        /// Report planned actions without mutating ledger, documents,
        /// or the remote store.
        #[arg(long)]
        dry_run: bool,

        /// Ignore fingerprints — treat every document as dirty.
        #[arg(long)]
        force: bool,

        /// Proceed even if the active store is at capacity.
        #[arg(long)]
        yes: bool,
    },

    /// Report each store's current usage against the watermarks.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            dry_run,
            force,
            yes,
        } => {
            let opts = sync::SyncOptions {
                dry_run,
                force,
                assume_yes: yes,
            };
            sync::run_sync(&cfg, &opts).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
    }

    Ok(())
}
