//! SQL statement execution over the REST statements endpoint.
//!
//! A statement is submitted once; a `202` answer means it is still
//! running and is polled by handle until it finishes. Multi-partition
//! results are fetched partition by partition and concatenated.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::ServiceConfig;
use super::http::{build_client, default_headers, ensure_success, request_id};
use crate::error::ServiceError;

const STATEMENTS_PATH: &str = "api/v2/statements";
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Column names that identify a game in a result set.
pub const GAME_COLUMNS: [&str; 3] = ["id", "game_id", "partita_id"];

/// A typed bind value for a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

impl Binding {
    /// An integer value.
    #[must_use]
    pub fn fixed(value: i64) -> Self {
        Self {
            kind: "FIXED",
            value: value.to_string(),
        }
    }

    /// A string value.
    #[must_use]
    pub fn text(value: &str) -> Self {
        Self {
            kind: "TEXT",
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
    role: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, Binding>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    row_type: Vec<ColumnType>,
    #[serde(default)]
    partition_info: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
    #[serde(default)]
    statement_handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PartitionResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

/// Rows returned by a statement.
///
/// Every value arrives as text; `None` is SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Row values, one entry per column.
    pub rows: Vec<Vec<Option<String>>>,
    /// Server handle of the finished statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_handle: Option<String>,
}

impl ResultSet {
    /// Returns the index of a column, ignoring case.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Returns the first column that holds game ids.
    #[must_use]
    pub fn game_column(&self) -> Option<usize> {
        self.columns.iter().position(|c| {
            GAME_COLUMNS
                .iter()
                .any(|candidate| c.eq_ignore_ascii_case(candidate))
        })
    }

    /// Returns the game id in `row` (0-based), if the result has a game column.
    #[must_use]
    pub fn game_id(&self, row: usize) -> Option<&str> {
        let col = self.game_column()?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Returns true if no rows were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parses a numeric cell.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidResponse`] if the cell is missing,
    /// `NULL`, or not a number.
    pub fn number(&self, row: usize, col: usize) -> Result<f64, ServiceError> {
        let cell = self.text(row, col)?;
        cell.trim().parse::<f64>().map_err(|e| {
            ServiceError::InvalidResponse(format!(
                "column {} row {row}: {cell:?} is not a number: {e}",
                self.columns.get(col).map_or("?", String::as_str)
            ))
        })
    }

    /// Returns a non-null text cell.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidResponse`] if the cell is missing or
    /// `NULL`.
    pub fn text(&self, row: usize, col: usize) -> Result<&str, ServiceError> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(Option::as_deref)
            .ok_or_else(|| {
                ServiceError::InvalidResponse(format!("missing value at row {row}, column {col}"))
            })
    }

    /// Returns the index of a required column.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidResponse`] if the column is absent.
    pub fn require_column(&self, name: &str) -> Result<usize, ServiceError> {
        self.column(name)
            .ok_or_else(|| ServiceError::InvalidResponse(format!("result has no column {name}")))
    }
}

/// Client for the statements endpoint.
#[derive(Debug, Clone)]
pub struct StatementClient {
    http: Client,
    config: ServiceConfig,
}

impl StatementClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client(config)?,
            config: config.clone(),
        })
    }

    /// Executes `statement` with positional `bindings` (`?` placeholders,
    /// numbered from 1) and returns all of its rows.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TransportRejected`] when the statement is
    /// refused (compilation errors included), [`ServiceError::StatementTimeout`]
    /// when it is still running after the request timeout, and
    /// [`ServiceError::InvalidResponse`] for an undecodable body.
    pub async fn execute(
        &self,
        statement: &str,
        bindings: &[Binding],
    ) -> Result<ResultSet, ServiceError> {
        let body = StatementRequest {
            statement,
            timeout: self.config.request_timeout.as_secs(),
            database: &self.config.database,
            schema: &self.config.schema,
            warehouse: &self.config.warehouse,
            role: &self.config.role,
            bindings: bindings
                .iter()
                .enumerate()
                .map(|(i, b)| ((i + 1).to_string(), b.clone()))
                .collect(),
        };
        let url = self.config.url(STATEMENTS_PATH);
        info!(url = %url, bindings = bindings.len(), "executing statement");

        let response = self
            .http
            .post(&url)
            .headers(default_headers(&self.config, "application/json")?)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;
        let response = self.wait_for_result(ensure_success(response).await?).await?;
        let id = request_id(&response);
        let parsed: StatementResponse = response.json().await?;

        let meta = parsed.result_set_meta_data.unwrap_or_default();
        let mut rows = parsed.data;
        if let Some(handle) = parsed.statement_handle.as_deref() {
            for partition in 1..meta.partition_info.len() {
                rows.extend(self.fetch_partition(handle, partition).await?);
            }
        }
        info!(
            rows = rows.len(),
            request_id = id.as_deref().unwrap_or("-"),
            "statement finished"
        );

        Ok(ResultSet {
            columns: meta.row_type.into_iter().map(|c| c.name).collect(),
            rows,
            statement_handle: parsed.statement_handle,
        })
    }

    fn handle_url(&self, handle: &str) -> String {
        self.config.url(&format!("{STATEMENTS_PATH}/{handle}"))
    }

    async fn wait_for_result(&self, mut response: Response) -> Result<Response, ServiceError> {
        let started = Instant::now();
        while response.status() == StatusCode::ACCEPTED {
            let pending: StatementResponse = response.json().await?;
            let handle = pending.statement_handle.ok_or_else(|| {
                ServiceError::InvalidResponse("pending statement has no handle".to_string())
            })?;
            if started.elapsed() >= self.config.request_timeout {
                return Err(ServiceError::StatementTimeout { handle });
            }
            debug!(handle = %handle, "statement still running");
            tokio::time::sleep(POLL_INTERVAL).await;

            let polled = self
                .http
                .get(self.handle_url(&handle))
                .headers(default_headers(&self.config, "application/json")?)
                .timeout(self.config.request_timeout)
                .send()
                .await?;
            response = ensure_success(polled).await?;
        }
        Ok(response)
    }

    async fn fetch_partition(
        &self,
        handle: &str,
        partition: usize,
    ) -> Result<Vec<Vec<Option<String>>>, ServiceError> {
        debug!(handle, partition, "fetching result partition");
        let response = self
            .http
            .get(self.handle_url(handle))
            .query(&[("partition", partition)])
            .headers(default_headers(&self.config, "application/json")?)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let page: PartitionResponse = ensure_success(response).await?.json().await?;
        Ok(page.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(columns: &[&str], rows: &[&[Option<&str>]]) -> ResultSet {
        ResultSet {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
            statement_handle: None,
        }
    }

    #[test]
    fn test_request_shape_with_bindings() {
        let body = StatementRequest {
            statement: "SELECT ?",
            timeout: 60,
            database: "DB",
            schema: "S",
            warehouse: "WH",
            role: "R",
            bindings: BTreeMap::from([("1".to_string(), Binding::fixed(30))]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["bindings"]["1"]["type"], "FIXED");
        assert_eq!(json["bindings"]["1"]["value"], "30");
        assert_eq!(json["warehouse"], "WH");
    }

    #[test]
    fn test_request_without_bindings_omits_field() {
        let body = StatementRequest {
            statement: "SELECT 1",
            timeout: 60,
            database: "DB",
            schema: "S",
            warehouse: "WH",
            role: "R",
            bindings: BTreeMap::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("bindings").is_none());
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "resultSetMetaData": {"numRows": 2, "rowType": [{"name": "ID", "type": "text"}, {"name": "RATING", "type": "fixed"}]},
            "data": [["abc", "1500"], ["def", null]],
            "statementHandle": "01b2"
        }"#;
        let parsed: StatementResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[1][1], None);
        assert_eq!(parsed.result_set_meta_data.unwrap().row_type[1].name, "RATING");
    }

    #[test]
    fn test_game_column_detection() {
        let rs = result(&["OPENING", "GAME_ID"], &[&[Some("Sicilian"), Some("g1")]]);
        assert_eq!(rs.game_column(), Some(1));
        assert_eq!(rs.game_id(0), Some("g1"));
        assert_eq!(rs.game_id(1), None);

        let rs = result(&["OPENING"], &[&[Some("Sicilian")]]);
        assert_eq!(rs.game_id(0), None);
    }

    #[test]
    fn test_number_cells() {
        let rs = result(&["TS", "RATING"], &[&[Some("2024-01-01"), Some("1500.5")], &[Some("x"), None]]);
        assert_eq!(rs.require_column("rating").unwrap(), 1);
        assert!((rs.number(0, 1).unwrap() - 1500.5).abs() < f64::EPSILON);
        assert!(matches!(rs.number(1, 1), Err(ServiceError::InvalidResponse(_))));
        assert!(matches!(rs.number(0, 0), Err(ServiceError::InvalidResponse(_))));
        assert!(rs.require_column("missing").is_err());
    }
}
