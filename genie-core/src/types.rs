//! Domain types shared by the client, the publisher and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier of a remote space. Supplied by the caller, never generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(pub String);

impl SpaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the snapshot for this space: `space_<id>.json`.
    pub fn snapshot_file_name(&self) -> String {
        format!("space_{}.json", self.0)
    }

    /// True when the identifier can be embedded in a single file name.
    pub fn is_file_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SpaceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SpaceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Bot identity
// ---------------------------------------------------------------------------

pub const DEFAULT_BOT_NAME: &str = "genie-backup-bot";
pub const DEFAULT_BOT_EMAIL: &str = "bot@company.com";

/// Author name/email stamped on automated commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub name: String,
    pub email: String,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            name: DEFAULT_BOT_NAME.to_string(),
            email: DEFAULT_BOT_EMAIL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Checkout strategy
// ---------------------------------------------------------------------------

/// How the publisher obtains its working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutStrategy {
    /// Use the checkout at the configured working directory and rewrite its remote URL.
    ReuseExisting,
    /// Clone into a temporary directory that is removed when the run ends.
    #[default]
    DisposableClone,
}

impl fmt::Display for CheckoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutStrategy::ReuseExisting => write!(f, "reuse-existing"),
            CheckoutStrategy::DisposableClone => write!(f, "disposable-clone"),
        }
    }
}

impl FromStr for CheckoutStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reuse-existing" | "in-place" => Ok(Self::ReuseExisting),
            "disposable-clone" | "clone" => Ok(Self::DisposableClone),
            other => Err(format!(
                "unknown checkout strategy '{other}'; expected: reuse-existing, disposable-clone"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn snapshot_file_name_uses_space_prefix() {
        assert_eq!(SpaceId::from("abc123").snapshot_file_name(), "space_abc123.json");
    }

    #[rstest]
    #[case("01f10e9a24f61b178118bb9b90e1b2a9", true)]
    #[case("abc-123_x", true)]
    #[case("", false)]
    #[case("..", false)]
    #[case("a/b", false)]
    #[case("a\\b", false)]
    #[case(".", false)]
    #[case("nul\0byte", false)]
    #[case("x..y", true)]
    fn file_safety(#[case] id: &str, #[case] safe: bool) {
        assert_eq!(SpaceId::from(id).is_file_safe(), safe);
    }

    #[test]
    fn strategy_parses_aliases_and_displays_canonical_name() {
        assert_eq!(
            "in-place".parse::<CheckoutStrategy>().unwrap(),
            CheckoutStrategy::ReuseExisting
        );
        assert_eq!(
            "Disposable-Clone".parse::<CheckoutStrategy>().unwrap(),
            CheckoutStrategy::DisposableClone
        );
        assert!("rebase".parse::<CheckoutStrategy>().is_err());
        assert_eq!(CheckoutStrategy::ReuseExisting.to_string(), "reuse-existing");
    }

    #[test]
    fn bot_identity_defaults() {
        let id = BotIdentity::default();
        assert_eq!(id.name, "genie-backup-bot");
        assert_eq!(id.email, "bot@company.com");
    }
}
