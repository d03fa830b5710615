//! Working copy management over `git2`.
//!
//! Each public method corresponds to one `git` subcommand and logs the
//! equivalent command line before running it. Command lines and library
//! error messages pass through the run's [`Redactor`], so the token never
//! reaches a log line or an error.

use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Commit, ConfigLevel, Cred, CredentialType, ErrorCode, FetchOptions, IndexAddOption, Oid,
    PushOptions, RemoteCallbacks, Repository, Signature, Status, StatusOptions,
};
use tempfile::TempDir;

use genie_core::{BotIdentity, Redactor, Secret};

use crate::error::SyncError;
use crate::remote::{authenticated_url, RemoteUrl};

/// What a pull did to the tracked branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForwarded,
    /// The remote has no such branch yet.
    NoUpstream,
}

/// A checkout the publisher writes into, plus the credential it pushes with.
pub struct WorkingCopy {
    repo: Repository,
    root: PathBuf,
    remote: String,
    branch: String,
    username: String,
    token: Secret,
    redactor: Redactor,
    // Dropped last: removes the clone (and its credential-bearing config) on every exit path.
    scratch: Option<TempDir>,
}

impl std::fmt::Debug for WorkingCopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingCopy")
            .field("root", &self.root)
            .field("remote", &self.remote)
            .field("branch", &self.branch)
            .field("disposable", &self.scratch.is_some())
            .finish()
    }
}

impl WorkingCopy {
    /// Reuse the checkout containing `workdir` (searched upward, as git does),
    /// rewriting `remote` to carry the token.
    pub fn open_existing(
        workdir: &Path,
        remote: &str,
        branch: &str,
        username: &str,
        token: &Secret,
    ) -> Result<Self, SyncError> {
        let redactor = token.redactor();
        let repo = step(
            &redactor,
            format!("git -C {} rev-parse --show-toplevel", workdir.display()),
            || Repository::discover(workdir),
        )?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| SyncError::BareRepository {
                path: workdir.to_path_buf(),
            })?;
        tracing::info!("repo root: {}", root.display());

        let original = step(
            &redactor,
            format!("git config --get remote.{remote}.url"),
            || match repo.find_remote(remote) {
                Ok(r) => Ok(r.url().map(str::to_string)),
                Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
                Err(e) => Err(e),
            },
        )?
        .filter(|url| !url.is_empty())
        .ok_or_else(|| SyncError::NoRemote {
            remote: remote.to_string(),
            path: root.clone(),
        })?;

        let url = authenticated_url(&original, username, token)?;
        step(
            &redactor,
            format!("git remote set-url {remote} {}", url.display()),
            || repo.remote_set_url(remote, url.expose()),
        )?;

        Ok(Self {
            repo,
            root,
            remote: remote.to_string(),
            branch: branch.to_string(),
            username: username.to_string(),
            token: token.clone(),
            redactor,
            scratch: None,
        })
    }

    /// Clone `repo_url` into a fresh temporary directory and check out `branch`.
    ///
    /// The directory is deleted when the returned value is dropped.
    pub fn clone_fresh(
        repo_url: &str,
        remote: &str,
        branch: &str,
        username: &str,
        token: &Secret,
    ) -> Result<Self, SyncError> {
        let redactor = token.redactor();
        let scratch = tempfile::Builder::new()
            .prefix("genie-backup-")
            .tempdir()
            .map_err(|e| crate::error::io_err(std::env::temp_dir(), e))?;
        let root = scratch.path().join("repo");
        let url: RemoteUrl = authenticated_url(repo_url, username, token)?;

        let repo = step(
            &redactor,
            format!("git clone {} {}", url.display(), root.display()),
            || {
                let mut fetch = FetchOptions::new();
                fetch.remote_callbacks(credential_callbacks(username, token));
                RepoBuilder::new().fetch_options(fetch).clone(url.expose(), &root)
            },
        )?;

        if remote != "origin" {
            step(&redactor, format!("git remote rename origin {remote}"), || {
                repo.remote_rename("origin", remote).map(|_| ())
            })?;
        }
        step(&redactor, format!("git checkout {branch}"), || {
            check_out_branch(&repo, remote, branch)
        })?;

        Ok(Self {
            repo,
            root,
            remote: remote.to_string(),
            branch: branch.to_string(),
            username: username.to_string(),
            token: token.clone(),
            redactor,
            scratch: Some(scratch),
        })
    }

    /// Root of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_disposable(&self) -> bool {
        self.scratch.is_some()
    }

    /// Write `user.name`/`user.email` to this repository's local config only.
    pub fn configure_identity(&self, identity: &BotIdentity) -> Result<(), SyncError> {
        let local = || -> Result<git2::Config, git2::Error> {
            self.repo.config()?.open_level(ConfigLevel::Local)
        };
        step(
            &self.redactor,
            format!("git config user.email {}", quoted(&identity.email)),
            || local()?.set_str("user.email", &identity.email),
        )?;
        step(
            &self.redactor,
            format!("git config user.name {}", quoted(&identity.name)),
            || local()?.set_str("user.name", &identity.name),
        )
    }

    /// Fetch the tracked branch and fast-forward onto it.
    ///
    /// A local branch that has diverged from the remote aborts the run.
    pub fn pull(&self) -> Result<PullOutcome, SyncError> {
        step(
            &self.redactor,
            format!("git pull {} {}", self.remote, self.branch),
            || {
                let refspec = format!(
                    "+refs/heads/{b}:refs/remotes/{r}/{b}",
                    b = self.branch,
                    r = self.remote
                );
                let mut remote = self.repo.find_remote(&self.remote)?;
                let mut fetch = FetchOptions::new();
                fetch.remote_callbacks(credential_callbacks(&self.username, &self.token));
                remote.fetch(&[refspec.as_str()], Some(&mut fetch), None)?;
                fast_forward(&self.repo, &self.remote, &self.branch)
            },
        )
    }

    /// Paths with any change relative to HEAD, untracked files included.
    pub fn changed_paths(&self) -> Result<Vec<String>, SyncError> {
        step(&self.redactor, "git status --porcelain".to_string(), || {
            let mut opts = StatusOptions::new();
            opts.include_untracked(true)
                .recurse_untracked_dirs(true)
                .include_ignored(false);
            let statuses = self.repo.statuses(Some(&mut opts))?;
            Ok(statuses
                .iter()
                .filter(|e| e.status() != Status::CURRENT && !e.status().contains(Status::IGNORED))
                .filter_map(|e| e.path().map(str::to_string))
                .collect())
        })
    }

    /// Stage every change and commit it on the tracked branch.
    pub fn commit_all(&self, identity: &BotIdentity, message: &str) -> Result<Oid, SyncError> {
        step(&self.redactor, "git add .".to_string(), || {
            let mut index = self.repo.index()?;
            index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
            index.update_all(["*"], None)?;
            index.write()
        })?;
        step(
            &self.redactor,
            format!("git commit -m {}", quoted(message)),
            || {
                let mut index = self.repo.index()?;
                let tree = self.repo.find_tree(index.write_tree()?)?;
                let signature = Signature::now(&identity.name, &identity.email)?;
                let parent = head_commit(&self.repo)?;
                let parents: Vec<&Commit<'_>> = parent.iter().collect();
                self.repo
                    .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            },
        )
    }

    /// Push the tracked branch; a rejected ref update is an error.
    pub fn push(&self) -> Result<(), SyncError> {
        step(
            &self.redactor,
            format!("git push {} {}", self.remote, self.branch),
            || {
                let refspec = format!("refs/heads/{b}:refs/heads/{b}", b = self.branch);
                let mut callbacks = credential_callbacks(&self.username, &self.token);
                callbacks.push_update_reference(|refname, status| match status {
                    Some(reason) => Err(git2::Error::from_str(&format!(
                        "push of {refname} rejected: {reason}"
                    ))),
                    None => Ok(()),
                });
                let mut options = PushOptions::new();
                options.remote_callbacks(callbacks);
                let mut remote = self.repo.find_remote(&self.remote)?;
                remote.push(&[refspec.as_str()], Some(&mut options))
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Log `command`, run `op`, and turn a git2 failure into a redacted [`SyncError::Git`].
fn step<T>(
    redactor: &Redactor,
    command: String,
    op: impl FnOnce() -> Result<T, git2::Error>,
) -> Result<T, SyncError> {
    let command = redactor.redact(&command);
    tracing::info!("Running: {command}");
    op().map_err(|err| {
        let message = redactor.redact(err.message());
        tracing::error!(command = %command, "git failed: {message}");
        SyncError::Git { command, message }
    })
}

/// Supply `username`/`token` once; a second request means the token was refused.
fn credential_callbacks<'a>(username: &'a str, token: &'a Secret) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut offered = false;
    callbacks.credentials(move |_url, _username_from_url, allowed| {
        if offered || !allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            return Err(git2::Error::from_str(
                "remote rejected the configured credentials",
            ));
        }
        offered = true;
        Cred::userpass_plaintext(username, token.expose())
    });
    callbacks
}

fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>, git2::Error> {
    match repo.head() {
        Ok(head) => head.peel_to_commit().map(Some),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Point HEAD at `branch`, creating it from the remote-tracking ref if needed.
///
/// Only an empty remote leaves HEAD on the unborn branch. A remote that has
/// other branches but not this one is an error: the clone's working tree
/// belongs to its default branch and must not be committed as `branch`.
fn check_out_branch(repo: &Repository, remote: &str, branch: &str) -> Result<(), git2::Error> {
    let local = format!("refs/heads/{branch}");
    if repo.find_reference(&local).is_err() {
        match repo.find_reference(&format!("refs/remotes/{remote}/{branch}")) {
            Ok(tracking) => {
                let commit = tracking.peel_to_commit()?;
                repo.branch(branch, &commit, false)?;
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                if repo.branches(Some(BranchType::Remote))?.next().is_some() {
                    return Err(git2::Error::from_str(&format!(
                        "remote {remote} has no branch {branch}"
                    )));
                }
                return repo.set_head(&local);
            }
            Err(e) => return Err(e),
        }
    }
    repo.set_head(&local)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))
}

fn fast_forward(repo: &Repository, remote: &str, branch: &str) -> Result<PullOutcome, git2::Error> {
    let local = format!("refs/heads/{branch}");
    match repo.head() {
        Ok(head) if head.name() != Some(local.as_str()) => {
            return Err(git2::Error::from_str(&format!(
                "checkout is on {}, expected {local}",
                head.name().unwrap_or("a detached HEAD")
            )));
        }
        Ok(_) => {}
        Err(e) if e.code() == ErrorCode::UnbornBranch => repo.set_head(&local)?,
        Err(e) => return Err(e),
    }

    let tracking = match repo.find_reference(&format!("refs/remotes/{remote}/{branch}")) {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(PullOutcome::NoUpstream),
        Err(e) => return Err(e),
    };
    let upstream = repo.reference_to_annotated_commit(&tracking)?;
    let (analysis, _) = repo.merge_analysis(&[&upstream])?;

    if analysis.is_up_to_date() {
        return Ok(PullOutcome::UpToDate);
    }
    if analysis.is_fast_forward() || analysis.is_unborn() {
        let target = repo.find_object(upstream.id(), None)?;
        repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
        match repo.find_reference(&local) {
            Ok(mut reference) => {
                reference.set_target(upstream.id(), "pull: fast-forward")?;
            }
            Err(_) => {
                repo.reference(&local, upstream.id(), true, "pull: create branch")?;
            }
        }
        repo.set_head(&local)?;
        return Ok(PullOutcome::FastForwarded);
    }
    Err(git2::Error::from_str(&format!(
        "local {branch} has diverged from {remote}/{branch}; refusing to merge"
    )))
}

/// Quote a value the way a shell would see it, for log display only.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
