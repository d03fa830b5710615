//! genie-backup: export analytics-space configuration into git.
//!
//! # Usage
//!
//! ```text
//! genie-backup backup --space-id <id> --secret-scope <scope> --secret-key <key>
//!                     [--git-username <name>] [--git-email <email>]
//!                     [--repo-url <url>] [--branch main] [--remote origin]
//!                     [--strategy reuse-existing|disposable-clone]
//!                     [--workdir <path>] [--configs-dir genie_configs]
//! genie-backup verify [--space-id <id>]
//! genie-backup bootstrap [--catalog <c>] [--schema <s>] [--table <t>] [--configs-root <path>]
//! ```
//!
//! Workspace credentials come from `DATABRICKS_HOST`/`DATABRICKS_TOKEN`
//! (a `.env` file is honoured) or a `~/.databrickscfg` profile.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{backup::BackupArgs, bootstrap::BootstrapArgs, verify::VerifyArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "genie-backup",
    version,
    about = "Back up analytics-space configuration to a git repository",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a space's configuration and commit it if it changed.
    Backup(BackupArgs),

    /// Check that a space's configuration can be fetched and decoded.
    Verify(VerifyArgs),

    /// Create a test space and export its configuration to disk.
    Bootstrap(BootstrapArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Backup(args) => args.run(),
        Commands::Verify(args) => args.run(),
        Commands::Bootstrap(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
