//! genie-core: domain types, run configuration, credentials, redaction.
//!
//! - [`types`]: newtypes and small domain enums
//! - [`config`]: [`BackupConfig`] and the workspace credential chain
//! - [`secret`]: [`Secret`] and [`Redactor`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod secret;
pub mod types;

pub use config::{BackupConfig, WorkspaceAuth};
pub use error::ConfigError;
pub use secret::{Redactor, Secret, MASK};
pub use types::{BotIdentity, CheckoutStrategy, SpaceId};
