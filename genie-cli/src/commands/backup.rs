//! `genie-backup backup`: fetch, snapshot, commit, push.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use genie_core::config::{resolve_strategy, DEFAULT_BRANCH, DEFAULT_CONFIGS_DIR, DEFAULT_REMOTE};
use genie_core::types::{DEFAULT_BOT_EMAIL, DEFAULT_BOT_NAME};
use genie_core::{BackupConfig, BotIdentity, CheckoutStrategy, SpaceId};
use genie_sync::{pipeline, BackupOutcome, PublishResult};

/// Arguments for `genie-backup backup`.
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Identifier of the space to back up.
    #[arg(long)]
    pub space_id: String,

    /// Secret scope holding the repository access token.
    #[arg(long)]
    pub secret_scope: String,

    /// Secret key of the repository access token.
    #[arg(long)]
    pub secret_key: String,

    /// Commit author name.
    #[arg(long, default_value = DEFAULT_BOT_NAME)]
    pub git_username: String,

    /// Commit author email.
    #[arg(long, default_value = DEFAULT_BOT_EMAIL)]
    pub git_email: String,

    /// Repository to clone. Selects the disposable-clone strategy unless
    /// `--strategy` says otherwise.
    #[arg(long)]
    pub repo_url: Option<String>,

    /// Branch to pull from and push to.
    #[arg(long, default_value = DEFAULT_BRANCH)]
    pub branch: String,

    /// Remote name used for pull and push.
    #[arg(long, default_value = DEFAULT_REMOTE)]
    pub remote: String,

    /// reuse-existing | disposable-clone.
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<CheckoutStrategy>,

    /// Existing checkout to reuse (reuse-existing only).
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Snapshot directory relative to the repository root.
    #[arg(long, default_value = DEFAULT_CONFIGS_DIR)]
    pub configs_dir: PathBuf,
}

impl BackupArgs {
    pub fn into_config(self) -> BackupConfig {
        let strategy = resolve_strategy(self.strategy, self.repo_url.as_deref());
        BackupConfig {
            space_id: SpaceId::from(self.space_id),
            secret_scope: self.secret_scope,
            secret_key: self.secret_key,
            identity: BotIdentity {
                name: self.git_username,
                email: self.git_email,
            },
            repo_url: self.repo_url,
            branch: self.branch,
            remote: self.remote,
            strategy,
            workdir: self.workdir,
            configs_dir: self.configs_dir,
        }
    }

    pub fn run(self) -> Result<()> {
        let config = self.into_config();
        config.validate().context("invalid backup arguments")?;

        println!(
            "Fetching configuration for Genie Space: {}...",
            config.space_id.to_string().bold()
        );
        let client = super::workspace_client()?;
        let outcome = pipeline::run(&config, &client, &client)
            .with_context(|| format!("backup failed for space '{}'", config.space_id))?;

        print_outcome(&outcome, &config.branch);
        Ok(())
    }
}

fn print_outcome(outcome: &BackupOutcome, branch: &str) {
    match &outcome.result {
        PublishResult::Committed {
            commit,
            changed_paths,
        } => {
            println!(
                "{} Backed up space '{}' ({} file(s) changed)",
                "✓".green(),
                outcome.space_id,
                changed_paths.len()
            );
            for path in changed_paths {
                println!("  ✎  {path}");
            }
            let short = commit.get(..12).unwrap_or(commit);
            println!("  Successfully pushed {short} to {branch}.");
        }
        PublishResult::Unchanged => {
            println!(
                "{} No changes to commit. Configuration is up to date.",
                "·".dimmed()
            );
            println!("  {}", outcome.snapshot.display());
        }
    }
}
