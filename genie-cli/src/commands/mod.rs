pub mod backup;
pub mod bootstrap;
pub mod verify;

use anyhow::{Context, Result};
use colored::Colorize;

use genie_client::WorkspaceClient;
use genie_core::WorkspaceAuth;

/// Resolve workspace credentials and build a client.
pub(crate) fn workspace_client() -> Result<WorkspaceClient> {
    let auth = WorkspaceAuth::resolve().context("cannot resolve workspace credentials")?;
    WorkspaceClient::new(&auth).context("cannot build workspace client")
}

/// `====` banner used by the interactive commands.
pub(crate) fn banner(title: &str) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("{}", title.bold());
    println!("{rule}");
}
