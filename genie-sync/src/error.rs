//! Error types for genie-sync.

use std::path::PathBuf;

use thiserror::Error;

use genie_client::ClientError;
use genie_core::ConfigError;

/// All errors that can abort a backup run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fetching the space or the repository token failed.
    #[error("workspace error: {0}")]
    Client(#[from] ClientError),

    /// The run configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A version-control step failed. Both fields are already redacted.
    #[error("git command failed: {command}: {message}")]
    Git { command: String, message: String },

    /// The working copy's remote is absent or has no URL.
    #[error("remote '{remote}' not found in {path}; is this a git checkout?")]
    NoRemote { remote: String, path: PathBuf },

    /// The reused checkout is bare and has nowhere to write a snapshot.
    #[error("{path} has no working directory")]
    BareRepository { path: PathBuf },

    /// Remote URL could not be rewritten to carry the credential.
    #[error("cannot build authenticated url from '{url}': {reason}")]
    RemoteUrl { url: String, reason: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization of the snapshot.
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
