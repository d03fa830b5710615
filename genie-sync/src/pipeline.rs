//! Backup pipeline: fetch → write snapshot → publish.
//!
//! ## Steps
//!
//! 1. Validate the [`BackupConfig`].
//! 2. Fetch the space document (missing serialized form degrades to `{}`).
//! 3. Retrieve the repository token from the secret store.
//! 4. Obtain a working copy (reuse + rewrite remote, or disposable clone).
//! 5. Set the bot identity in the working copy's local config.
//! 6. Pull the tracked branch (reused checkout only; a fresh clone is current).
//! 7. Write the canonical snapshot.
//! 8. Nothing reported by status → done, the remote is never written.
//! 9. Otherwise stage everything, commit, push.
//! 10. Drop the working copy; a disposable clone is deleted here on every path.
//!
//! Any failure aborts the run. Nothing is retried.

use std::path::PathBuf;

use genie_client::{SecretStore, SpaceSource};
use genie_core::{BackupConfig, CheckoutStrategy, SpaceId};

use crate::error::SyncError;
use crate::git::WorkingCopy;
use crate::snapshot::{snapshot_path, write_snapshot};

/// What the publisher did with the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    /// A commit was created and pushed.
    Committed {
        commit: String,
        changed_paths: Vec<String>,
    },
    /// The working copy was clean after writing the snapshot.
    Unchanged,
}

/// Summary of one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub space_id: SpaceId,
    /// Snapshot location relative to the repository root.
    pub snapshot: PathBuf,
    pub result: PublishResult,
}

/// Commit message for an automated backup of `space_id`.
pub fn commit_message(space_id: &SpaceId) -> String {
    format!("Backup: Automated Genie config update for Space {space_id}")
}

/// Run one backup of `config.space_id`.
pub fn run(
    config: &BackupConfig,
    source: &dyn SpaceSource,
    secrets: &dyn SecretStore,
) -> Result<BackupOutcome, SyncError> {
    config.validate()?;

    tracing::info!(space_id = %config.space_id, "fetching configuration");
    let document = source.fetch_space_config(&config.space_id)?;

    let token = secrets.get_secret(&config.secret_scope, &config.secret_key)?;

    tracing::info!(strategy = %config.strategy, "starting git operations");
    let working_copy = match config.strategy {
        CheckoutStrategy::ReuseExisting => WorkingCopy::open_existing(
            &config.workdir,
            &config.remote,
            &config.branch,
            &config.identity.name,
            &token,
        )?,
        CheckoutStrategy::DisposableClone => {
            // validate() guarantees the URL for this strategy.
            let url = config.repo_url.as_deref().unwrap_or_default();
            WorkingCopy::clone_fresh(
                url,
                &config.remote,
                &config.branch,
                &config.identity.name,
                &token,
            )?
        }
    };

    working_copy.configure_identity(&config.identity)?;

    if !working_copy.is_disposable() {
        let pulled = working_copy.pull()?;
        tracing::debug!(?pulled, "pull finished");
    }

    let relative = config
        .configs_dir
        .join(config.space_id.snapshot_file_name());
    let path = snapshot_path(working_copy.root(), &config.configs_dir, &config.space_id);
    write_snapshot(&path, &document)?;

    let changed = working_copy.changed_paths()?;
    if changed.is_empty() {
        tracing::info!("no changes to commit; configuration is up to date");
        return Ok(BackupOutcome {
            space_id: config.space_id.clone(),
            snapshot: relative,
            result: PublishResult::Unchanged,
        });
    }

    tracing::info!(files = changed.len(), "changes detected; committing");
    let commit = working_copy.commit_all(&config.identity, &commit_message(&config.space_id))?;
    working_copy.push()?;
    tracing::info!(%commit, "pushed changes to {}", config.branch);

    Ok(BackupOutcome {
        space_id: config.space_id.clone(),
        snapshot: relative,
        result: PublishResult::Committed {
            commit: commit.to_string(),
            changed_paths: changed,
        },
    })
}
