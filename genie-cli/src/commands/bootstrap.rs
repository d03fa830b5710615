//! `genie-backup bootstrap`: provision a throwaway space and export it.
//!
//! Picks a warehouse, finds (or creates) a couple of tables, creates a
//! space over them, reads it back and writes the snapshot to disk.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};

use genie_client::{
    decode_serialized_space, pick_warehouse, CreateSpaceRequest, StatementRequest, WorkspaceClient,
};
use genie_core::SpaceId;
use genie_sync::{snapshot_path, write_snapshot};

use super::{banner, verify::ConfigSummary, workspace_client};

const MAX_SPACE_TABLES: usize = 2;
const TABLE_DESCRIPTION: &str = "Table for Genie automation test";
const EMPTY_SPACE_QUESTION: &str = "This is a test space for backup verification.";
const TABLE_SPACE_QUESTION: &str = "How many users are in the table?";

/// Arguments for `genie-backup bootstrap`.
#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Catalog to look for (or create) test tables in.
    #[arg(long, default_value = "cicaktest_catalog")]
    pub catalog: String,

    /// Schema inside the catalog.
    #[arg(long, default_value = "default")]
    pub schema: String,

    /// Table created when the schema has none.
    #[arg(long, default_value = "genie_test_users")]
    pub table: String,

    #[arg(long, default_value = "Genie Automation Test Space")]
    pub title: String,

    #[arg(long, default_value = "A test space for verifying automated backups.")]
    pub description: String,

    /// Directory the `genie_configs/` snapshot folder is created under.
    #[arg(long, default_value = ".")]
    pub configs_root: PathBuf,

    /// Snapshot directory, relative to `--configs-root`.
    #[arg(long, default_value = "genie_configs")]
    pub configs_dir: PathBuf,
}

/// Version-2 space document over `tables`.
///
/// Table entries are sorted by identifier; `question_id` is supplied by the
/// caller so the document is deterministic under test.
pub fn space_document(tables: &[String], question_id: &str) -> Value {
    let mut identifiers: Vec<&String> = tables.iter().collect();
    identifiers.sort();
    let table_entries: Vec<Value> = identifiers
        .into_iter()
        .map(|identifier| {
            json!({
                "identifier": identifier,
                "description": [TABLE_DESCRIPTION],
                "column_configs": [],
            })
        })
        .collect();
    let question = if tables.is_empty() {
        EMPTY_SPACE_QUESTION
    } else {
        TABLE_SPACE_QUESTION
    };
    json!({
        "version": 2,
        "config": {
            "sample_questions": [
                {"id": question_id, "question": [question]}
            ]
        },
        "data_sources": {
            "tables": table_entries,
        },
        "instructions": {
            "text_instructions": [],
            "example_question_sqls": [],
            "sql_snippets": {
                "measures": [],
                "filters": [],
                "expressions": [],
            },
            "join_specs": [],
            "sql_functions": [],
        },
    })
}

impl BootstrapArgs {
    pub fn run(self) -> Result<()> {
        let client = workspace_client()?;
        banner("Creating Genie Space for Backup Testing");

        let warehouses = client.list_warehouses().context("error listing SQL warehouses")?;
        let Some(warehouse) = pick_warehouse(&warehouses) else {
            bail!("no SQL warehouses found; a space needs a warehouse to run queries");
        };
        println!("Using warehouse: {} ({})", warehouse.name, warehouse.id);
        let warehouse_id = warehouse.id.clone();

        let tables = self.find_or_create_tables(&client, &warehouse_id);
        if tables.is_empty() {
            println!("{}", "No tables available; creating a space without data sources.".yellow());
        } else {
            println!("Using tables: {}", tables.join(", "));
        }

        let question_id = uuid::Uuid::new_v4().simple().to_string();
        let document = space_document(&tables, &question_id);
        let request = CreateSpaceRequest {
            serialized_space: serde_json::to_string(&document)?,
            warehouse_id,
            title: self.title.clone(),
            description: self.description.clone(),
        };
        let space_id = client.create_space(&request).context("error creating Genie space")?;
        println!("{} {}", "Created space:".green(), space_id);

        let response = client
            .get_space(&space_id, true)
            .with_context(|| format!("error fetching space '{space_id}' after creation"))?;
        let exported = decode_serialized_space(&space_id, &response)?;
        let summary = ConfigSummary::of(&exported);
        println!("Fetched config back: {} table(s)", summary.tables.len());

        let path = snapshot_path(&self.configs_root, &self.configs_dir, &space_id);
        let write = write_snapshot(&path, &exported)
            .with_context(|| format!("error writing snapshot for '{space_id}'"))?;
        println!("Saved config to {}", write.path().display());

        self.print_summary(&client, &space_id);
        Ok(())
    }

    /// Existing tables in the schema, or a freshly seeded one.
    ///
    /// Listing or creation failures are not fatal: the space is simply
    /// created without data sources.
    fn find_or_create_tables(&self, client: &WorkspaceClient, warehouse_id: &str) -> Vec<String> {
        let existing = client
            .list_tables(&self.catalog, &self.schema, 10)
            .unwrap_or_else(|e| {
                tracing::warn!(catalog = %self.catalog, schema = %self.schema, error = %e, "cannot list tables");
                Vec::new()
            });
        if !existing.is_empty() {
            return existing
                .iter()
                .take(MAX_SPACE_TABLES)
                .map(|t| t.identifier().to_string())
                .collect();
        }

        let full_name = format!("{}.{}.{}", self.catalog, self.schema, self.table);
        println!("No tables found; creating {full_name}");
        let statements = [
            format!("CREATE TABLE IF NOT EXISTS {full_name} (id INT, name STRING)"),
            format!("INSERT INTO {full_name} VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Charlie')"),
        ];
        for statement in statements {
            let request = StatementRequest {
                warehouse_id: warehouse_id.to_string(),
                statement,
                catalog: self.catalog.clone(),
                schema: self.schema.clone(),
                wait_timeout: "30s".to_string(),
            };
            if let Err(e) = client.execute_statement(&request) {
                tracing::warn!(table = %full_name, error = %e, "cannot create test table");
                return Vec::new();
            }
        }
        vec![full_name]
    }

    fn print_summary(&self, client: &WorkspaceClient, space_id: &SpaceId) {
        let host = client.host().trim_end_matches('/');
        println!();
        banner("SUCCESS");
        println!("Space ID:    {space_id}");
        println!("Title:       {}", self.title);
        println!("URL:         {host}/genie/rooms/{space_id}");
        println!();
        println!("Back it up with:");
        println!(
            "  genie-backup backup --space-id {space_id} --secret-scope <scope> --secret-key <key>"
        );
    }
}
