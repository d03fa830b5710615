//! Error types for genie-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling or validating run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No host/token pair was found in the environment or the profile file.
    #[error(
        "workspace credentials not found; set DATABRICKS_HOST and DATABRICKS_TOKEN \
         or configure profile '{profile}' in {path}"
    )]
    MissingCredentials { profile: String, path: PathBuf },

    /// The workspace host could not be turned into an `https://` URL.
    #[error("invalid workspace host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// A required field is empty or malformed.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A secret value that cannot be redacted safely.
    #[error("invalid secret: {0}")]
    InvalidSecret(&'static str),

    /// The profile file exists but could not be read.
    #[error("cannot read profile file {path}: {source}")]
    ProfileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`ConfigError::InvalidField`].
pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidField {
        field,
        reason: reason.into(),
    }
}
