//! Run configuration and workspace credentials.
//!
//! # Credential chain
//!
//! 1. `.env` in the working directory (loaded into the process environment, missing file ignored)
//! 2. `DATABRICKS_HOST` + `DATABRICKS_TOKEN`
//! 3. profile `$DATABRICKS_CONFIG_PROFILE` (default `DEFAULT`) in
//!    `$DATABRICKS_CONFIG_FILE` (default `~/.databrickscfg`)
//!
//! [`WorkspaceAuth::resolve_with`] takes the environment lookup and home
//! directory explicitly; tests must use it rather than [`WorkspaceAuth::resolve`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{invalid, ConfigError};
use crate::secret::Secret;
use crate::types::{BotIdentity, CheckoutStrategy, SpaceId};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_CONFIGS_DIR: &str = "genie_configs";
pub const DEFAULT_PROFILE: &str = "DEFAULT";
pub const PROFILE_FILE_NAME: &str = ".databrickscfg";

// ---------------------------------------------------------------------------
// BackupConfig
// ---------------------------------------------------------------------------

/// Everything one backup run needs, passed explicitly into the pipeline.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub space_id: SpaceId,
    pub secret_scope: String,
    pub secret_key: String,
    pub identity: BotIdentity,
    /// Target repository. Required for [`CheckoutStrategy::DisposableClone`];
    /// the reused checkout reads it from its own remote otherwise.
    pub repo_url: Option<String>,
    pub branch: String,
    pub remote: String,
    pub strategy: CheckoutStrategy,
    /// Root of the existing checkout for [`CheckoutStrategy::ReuseExisting`].
    pub workdir: PathBuf,
    /// Snapshot directory, relative to the working copy root.
    pub configs_dir: PathBuf,
}

impl BackupConfig {
    /// A config with every optional field at its default.
    pub fn new(
        space_id: impl Into<SpaceId>,
        secret_scope: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            space_id: space_id.into(),
            secret_scope: secret_scope.into(),
            secret_key: secret_key.into(),
            identity: BotIdentity::default(),
            repo_url: None,
            branch: DEFAULT_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            strategy: CheckoutStrategy::default(),
            workdir: PathBuf::from("."),
            configs_dir: PathBuf::from(DEFAULT_CONFIGS_DIR),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.space_id.as_str().trim().is_empty() {
            return Err(invalid("space id", "must not be empty"));
        }
        if !self.space_id.is_file_safe() {
            return Err(invalid(
                "space id",
                format!("'{}' cannot be used in a file name", self.space_id),
            ));
        }
        if self.secret_scope.trim().is_empty() {
            return Err(invalid("secret scope", "must not be empty"));
        }
        if self.secret_key.trim().is_empty() {
            return Err(invalid("secret key", "must not be empty"));
        }
        if self.identity.name.trim().is_empty() {
            return Err(invalid("git username", "must not be empty"));
        }
        if self.identity.email.trim().is_empty() {
            return Err(invalid("git email", "must not be empty"));
        }
        if self.branch.trim().is_empty() || self.branch.contains(char::is_whitespace) {
            return Err(invalid("branch", format!("'{}' is not a branch name", self.branch)));
        }
        if self.remote.trim().is_empty() {
            return Err(invalid("remote", "must not be empty"));
        }
        if self.configs_dir.is_absolute() {
            return Err(invalid(
                "configs dir",
                "must be relative to the working copy root",
            ));
        }
        if self.strategy == CheckoutStrategy::DisposableClone
            && self.repo_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(invalid(
                "repository url",
                "required when cloning into a disposable directory",
            ));
        }
        Ok(())
    }
}

/// Pick a strategy when the caller did not name one: clone when a target
/// URL is known, otherwise reuse the checkout the process runs in.
pub fn resolve_strategy(explicit: Option<CheckoutStrategy>, repo_url: Option<&str>) -> CheckoutStrategy {
    match (explicit, repo_url) {
        (Some(strategy), _) => strategy,
        (None, Some(_)) => CheckoutStrategy::DisposableClone,
        (None, None) => CheckoutStrategy::ReuseExisting,
    }
}

// ---------------------------------------------------------------------------
// WorkspaceAuth
// ---------------------------------------------------------------------------

/// Host and personal access token for the workspace REST API.
#[derive(Debug, Clone)]
pub struct WorkspaceAuth {
    /// Normalized: scheme present, no trailing slash.
    pub host: String,
    pub token: Secret,
}

impl WorkspaceAuth {
    pub fn new(host: &str, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            host: normalize_host(host)?,
            token: Secret::new(token.trim())?,
        })
    }

    /// Resolve from the process environment (after loading `.env`) and `~/.databrickscfg`.
    pub fn resolve() -> Result<Self, ConfigError> {
        if let Some(err) = dotenv_problem(dotenvy::dotenv()) {
            tracing::warn!(error = %err, "ignoring unreadable .env file");
        }
        let home = dirs::home_dir();
        Self::resolve_with(|name| std::env::var(name).ok(), home.as_deref())
    }

    /// Resolve with an explicit environment lookup and home directory.
    pub fn resolve_with<F>(env: F, home: Option<&Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let (Some(host), Some(token)) = (non_empty("DATABRICKS_HOST"), non_empty("DATABRICKS_TOKEN")) {
            tracing::debug!("workspace credentials from environment");
            return Self::new(&host, &token);
        }

        let profile = non_empty("DATABRICKS_CONFIG_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let path = match non_empty("DATABRICKS_CONFIG_FILE") {
            Some(p) => PathBuf::from(p),
            None => home
                .map(|h| h.join(PROFILE_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(PROFILE_FILE_NAME)),
        };
        let missing = || ConfigError::MissingCredentials {
            profile: profile.clone(),
            path: path.clone(),
        };

        if !path.exists() {
            return Err(missing());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::ProfileIo {
            path: path.clone(),
            source,
        })?;
        let sections = parse_profiles(&contents);
        let section = sections.get(&profile).ok_or_else(missing)?;
        // Environment values override individual profile entries.
        let host = non_empty("DATABRICKS_HOST").or_else(|| section.get("host").cloned());
        let token = non_empty("DATABRICKS_TOKEN").or_else(|| section.get("token").cloned());
        match (host, token) {
            (Some(host), Some(token)) => {
                tracing::debug!(profile = %profile, path = %path.display(), "workspace credentials from profile file");
                Self::new(&host, &token)
            }
            _ => Err(missing()),
        }
    }
}

/// `host` → `https://host` with no trailing slash.
pub fn normalize_host(host: &str) -> Result<String, ConfigError> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidHost {
            host: host.to_string(),
            reason: "empty".to_string(),
        });
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&with_scheme).map_err(|e| ConfigError::InvalidHost {
        host: host.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "https" | "http") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidHost {
            host: host.to_string(),
            reason: "expected an http(s) URL with a host".to_string(),
        });
    }
    Ok(with_scheme)
}

/// The error worth reporting from a `.env` load; a missing file is not one.
fn dotenv_problem(result: Result<PathBuf, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env");
            None
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(e),
    }
}

/// Parse an INI-style profile file into `section -> key -> value`.
fn parse_profiles(contents: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let (Some(section), Some((key, value))) = (current.as_ref(), line.split_once('=')) else {
            continue;
        };
        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }
    sections
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
