//! `genie-backup verify`: prove the fetch path works without touching git.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use genie_client::decode_serialized_space;
use genie_core::SpaceId;

use super::{banner, workspace_client};

const MAX_LISTED_TABLES: usize = 5;

/// Arguments for `genie-backup verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Space to fetch; defaults to the first space the caller can see.
    #[arg(long)]
    pub space_id: Option<String>,
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "table")]
    identifier: String,
}

/// Counts pulled out of a configuration document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConfigSummary {
    pub tables: Vec<String>,
    pub metric_views: usize,
}

impl ConfigSummary {
    pub fn of(doc: &Value) -> Self {
        let sources = &doc["data_sources"];
        let tables = sources["tables"]
            .as_array()
            .map(|tables| {
                tables
                    .iter()
                    .map(|t| t["identifier"].as_str().unwrap_or("?").to_string())
                    .collect()
            })
            .unwrap_or_default();
        let metric_views = sources["metric_views"].as_array().map_or(0, Vec::len);
        Self {
            tables,
            metric_views,
        }
    }
}

impl VerifyArgs {
    pub fn run(self) -> Result<()> {
        let client = workspace_client()?;
        banner("Genie Configuration Fetch Verification");

        let (space_id, space_name) = match self.space_id {
            Some(id) => (SpaceId::from(id.as_str()), format!("Space {id}")),
            None => {
                let spaces = client.list_spaces().context("error listing spaces")?;
                println!("\nFound {} Genie space(s)", spaces.len());
                let Some(first) = spaces.into_iter().next() else {
                    println!("No Genie spaces found in this workspace.");
                    println!("Pass --space-id <id> to test with a known space ID.");
                    return Ok(());
                };
                let name = first.title.clone().unwrap_or_else(|| "Unknown".to_string());
                (SpaceId::from(first.space_id), name)
            }
        };
        println!("\nTest Space: {space_name} (ID: {space_id})");

        let response = client
            .get_space(&space_id, true)
            .with_context(|| format!("error fetching space details for '{space_id}'"))?;
        let doc = decode_serialized_space(&space_id, &response)?;
        let summary = ConfigSummary::of(&doc);

        println!("\nSuccessfully fetched config:");
        println!("  - Tables: {}", summary.tables.len());
        if !summary.tables.is_empty() {
            let rows = summary
                .tables
                .iter()
                .take(MAX_LISTED_TABLES)
                .map(|identifier| TableRow {
                    identifier: identifier.clone(),
                });
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        if summary.tables.len() > MAX_LISTED_TABLES {
            println!("    ... and {} more", summary.tables.len() - MAX_LISTED_TABLES);
        }
        if summary.metric_views > 0 {
            println!("  - Metric views: {}", summary.metric_views);
        }

        println!();
        banner(&format!(
            "{} Genie config fetch logic works.",
            "VERIFICATION PASSED:".green()
        ));
        Ok(())
    }
}
