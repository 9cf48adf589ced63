//! [`Warehouse`] implementation over the Snowflake SQL API (v2).
//!
//! Statements are submitted with `POST /api/v2/statements`. Long-running
//! statements answer `202 Accepted` and are polled by handle; large result
//! sets arrive in partitions fetched with `?partition=n`.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use telemetry_types::ExtractError;

use crate::backend::Warehouse;
use crate::config::ConnectionConfig;
use crate::row::Row;

const STATEMENTS_PATH: &str = "/api/v2/statements";
const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct SubmitRequest<'a> {
    statement: &'a str,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "statementHandle", default)]
    statement_handle: Option<String>,
    #[serde(rename = "resultSetMetaData", default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultSetMetaData {
    #[serde(rename = "rowType", default)]
    row_type: Vec<RowType>,
    #[serde(rename = "partitionInfo", default)]
    partition_info: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

/// Warehouse session over HTTPS. One instance is reused for the whole run.
pub struct SqlApiWarehouse {
    client: Client,
    statements_url: String,
    token: String,
    token_type: String,
    database: String,
    schema: String,
    warehouse: String,
    role: Option<String>,
    statement_timeout_secs: u64,
}

impl SqlApiWarehouse {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns a `config` error when a connection parameter is missing or
    /// the HTTP client cannot be constructed.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("telemetry-extractor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractError::config("HTTP_CLIENT", e.to_string()))?;

        Ok(Self {
            client,
            statements_url: format!("{}{STATEMENTS_PATH}", config.base_url()),
            token: config.password.clone(),
            token_type: config.token_type.clone(),
            database: config.database.clone(),
            schema: config.schema.clone(),
            warehouse: config.warehouse.clone(),
            role: config.role.clone(),
            statement_timeout_secs: config.statement_timeout_secs,
        })
    }

    async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<(StatusCode, StatementResponse), ExtractError> {
        let response = request
            .bearer_auth(&self.token)
            .header(TOKEN_TYPE_HEADER, &self.token_type)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if status == StatusCode::OK || status == StatusCode::ACCEPTED {
            let parsed = serde_json::from_str(&body).map_err(|e| {
                ExtractError::data(
                    "INVALID_RESPONSE",
                    format!("cannot decode statement response: {e}"),
                )
            })?;
            return Ok((status, parsed));
        }
        Err(status_error(status, &body))
    }

    async fn run_statement(&self, sql: &str) -> Result<Vec<Row>, ExtractError> {
        tracing::debug!(sql, "Submitting statement");
        let submit = self.client.post(&self.statements_url).json(&SubmitRequest {
            statement: sql,
            timeout: self.statement_timeout_secs,
            database: &self.database,
            schema: &self.schema,
            warehouse: &self.warehouse,
            role: self.role.as_deref(),
        });
        let (mut status, mut response) = self.send(submit).await?;

        while status == StatusCode::ACCEPTED {
            let handle = response.statement_handle.clone().ok_or_else(|| {
                ExtractError::data("MISSING_HANDLE", "202 response without a statement handle")
            })?;
            tracing::debug!(handle, "Statement still running, polling");
            tokio::time::sleep(POLL_INTERVAL).await;
            let poll = self.client.get(format!("{}/{handle}", self.statements_url));
            (status, response) = self.send(poll).await?;
        }

        let meta = response.result_set_meta_data.take().unwrap_or_default();
        let columns: Vec<String> = meta.row_type.into_iter().map(|t| t.name).collect();
        let mut rows = rows_from_data(&columns, std::mem::take(&mut response.data));

        if meta.partition_info.len() > 1 {
            let handle = response.statement_handle.clone().ok_or_else(|| {
                ExtractError::data(
                    "MISSING_HANDLE",
                    "partitioned result without a statement handle",
                )
            })?;
            for partition in 1..meta.partition_info.len() {
                let page = self
                    .client
                    .get(format!("{}/{handle}", self.statements_url))
                    .query(&[("partition", partition)]);
                let (_, page) = self.send(page).await?;
                rows.extend(rows_from_data(&columns, page.data));
            }
        }

        tracing::debug!(
            rows = rows.len(),
            code = response.code.as_deref(),
            message = response.message.as_deref(),
            "Statement finished"
        );
        Ok(rows)
    }
}

impl Warehouse for SqlApiWarehouse {
    async fn execute(&self, sql: &str) -> Result<(), ExtractError> {
        self.run_statement(sql).await.map(|_| ())
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>, ExtractError> {
        self.run_statement(sql).await
    }
}

fn rows_from_data(columns: &[String], data: Vec<Vec<Option<String>>>) -> Vec<Row> {
    data.into_iter()
        .map(|values| Row::new(columns.iter().cloned().zip(values).collect()))
        .collect()
}

fn transport_error(e: reqwest::Error) -> ExtractError {
    if e.is_builder() {
        return ExtractError::config("INVALID_REQUEST", e.to_string());
    }
    ExtractError::transient_network("HTTP_TRANSPORT", e.to_string())
}

/// Classify a non-success HTTP answer.
fn status_error(status: StatusCode, body: &str) -> ExtractError {
    let parsed: StatementResponse = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| format!("HTTP {status}: {}", body.trim()));
    let code = parsed.code.unwrap_or_else(|| status.as_u16().to_string());

    match status.as_u16() {
        401 | 403 => ExtractError::auth(code, message),
        408 | 429 | 500 | 502 | 503 | 504 => ExtractError::transient_db(code, message),
        _ => ExtractError::sql(code, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_types::ErrorCategory;

    #[test]
    fn decodes_result_set_into_rows() {
        let body = r#"{
            "resultSetMetaData": {
                "numRows": 2,
                "format": "jsonv2",
                "partitionInfo": [{"rowCount": 2}],
                "rowType": [{"name": "name", "type": "text"}, {"name": "schema_name", "type": "text"}]
            },
            "data": [["events", "PUBLIC"], ["audit", null]],
            "code": "090001",
            "statementHandle": "01b2-0000",
            "message": "Statement executed successfully."
        }"#;
        let mut response: StatementResponse = serde_json::from_str(body).unwrap();
        let meta = response.result_set_meta_data.take().unwrap();
        let columns: Vec<String> = meta.row_type.into_iter().map(|t| t.name).collect();
        let rows = rows_from_data(&columns, response.data);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("NAME"), Some("events"));
        assert_eq!(rows[1].get("schema_name"), None);
    }

    #[test]
    fn statement_errors_are_not_transient() {
        let err = status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code":"002003","message":"SQL compilation error: Object does not exist"}"#,
        );
        assert_eq!(err.category, ErrorCategory::Sql);
        assert_eq!(err.code, "002003");
        assert!(err.message.contains("does not exist"));
    }

    #[test]
    fn throttling_and_outages_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            assert_eq!(
                status_error(status, "").category,
                ErrorCategory::TransientDb,
                "{status}"
            );
        }
    }

    #[test]
    fn unauthorized_is_auth_error() {
        let err = status_error(StatusCode::UNAUTHORIZED, "not json");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert_eq!(err.code, "401");
        assert!(err.message.contains("not json"));
    }
}
