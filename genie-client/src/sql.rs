//! SQL warehouses, Unity Catalog tables and statement execution.
//!
//! Only used by the bootstrap tooling that provisions a test space.

use serde::{Deserialize, Serialize};

use crate::client::WorkspaceClient;
use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
pub struct Warehouse {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enable_serverless_compute: Option<bool>,
    #[serde(default)]
    pub warehouse_type: Option<String>,
}

impl Warehouse {
    /// Spaces need a serverless or PRO warehouse.
    pub fn is_space_capable(&self) -> bool {
        self.enable_serverless_compute.unwrap_or(false)
            || self
                .warehouse_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("PRO"))
    }
}

/// First capable warehouse, falling back to any warehouse at all.
pub fn pick_warehouse(warehouses: &[Warehouse]) -> Option<&Warehouse> {
    warehouses
        .iter()
        .find(|w| w.is_space_capable())
        .or_else(|| warehouses.first())
}

#[derive(Debug, Deserialize)]
struct ListWarehousesResponse {
    #[serde(default)]
    warehouses: Vec<Warehouse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl TableInfo {
    /// Three-part name when known, else the bare table name.
    pub fn identifier(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct ListTablesResponse {
    #[serde(default)]
    tables: Vec<TableInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementRequest {
    pub warehouse_id: String,
    pub statement: String,
    pub catalog: String,
    pub schema: String,
    pub wait_timeout: String,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement_id: String,
    #[serde(default)]
    status: Option<StatementStatus>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    #[serde(default)]
    state: String,
    #[serde(default)]
    error: Option<StatementErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StatementErrorBody {
    #[serde(default)]
    message: String,
}

impl WorkspaceClient {
    pub fn list_warehouses(&self) -> Result<Vec<Warehouse>, ClientError> {
        let url = self.endpoint(&["api", "2.0", "sql", "warehouses"])?;
        let response: ListWarehousesResponse = self.get_json(&url, &[])?;
        Ok(response.warehouses)
    }

    pub fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
        max_results: u32,
    ) -> Result<Vec<TableInfo>, ClientError> {
        let url = self.endpoint(&["api", "2.1", "unity-catalog", "tables"])?;
        let max_results = max_results.to_string();
        let response: ListTablesResponse = self.get_json(
            &url,
            &[
                ("catalog_name", catalog),
                ("schema_name", schema),
                ("max_results", &max_results),
            ],
        )?;
        Ok(response.tables)
    }

    /// Run a statement and wait up to `wait_timeout` for it to finish.
    ///
    /// Returns the statement id; a failed, canceled or closed statement is an error.
    pub fn execute_statement(&self, request: &StatementRequest) -> Result<String, ClientError> {
        let url = self.endpoint(&["api", "2.0", "sql", "statements"])?;
        let response: StatementResponse = self.post_json(&url, request)?;
        check_statement(response)
    }
}

fn check_statement(response: StatementResponse) -> Result<String, ClientError> {
    let Some(status) = response.status else {
        return Ok(response.statement_id);
    };
    match status.state.as_str() {
        "FAILED" | "CANCELED" | "CLOSED" => Err(ClientError::Statement {
            statement_id: response.statement_id,
            state: status.state,
            message: status.error.map(|e| e.message).unwrap_or_default(),
        }),
        _ => Ok(response.statement_id),
    }
}
