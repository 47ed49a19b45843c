//! Warehouse upload.
//!
//! Rows are appended to a named table; there is no dedup and no upsert, so
//! running the pipeline twice writes the rows twice. The production client
//! talks to BigQuery's streaming-insert endpoint (`tabledata.insertAll`)
//! with a bearer token supplied by configuration.

use crate::config::WarehouseConfig;
use crate::error::UploadError;
use crate::models::WarehouseRow;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Fully-qualified table name, `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl FromStr for TableId {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(Self {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                    table: table.to_string(),
                })
            }
            _ => Err(UploadError::InvalidTableId(s.to_string())),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Result of a successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub table: TableId,
    pub rows: usize,
}

/// Something rows can be appended to.
pub trait Warehouse {
    async fn append(
        &self,
        table: &TableId,
        rows: &[WarehouseRow],
    ) -> Result<AppendOutcome, UploadError>;
}

/// BigQuery streaming-insert client.
pub struct BigQueryClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl BigQueryClient {
    /// Build the client from configuration.
    ///
    /// # Errors
    ///
    /// Fails when no access token is configured, when the token file cannot
    /// be read, or when the HTTP client cannot be built.
    #[instrument(level = "info", skip_all, fields(endpoint = %config.endpoint))]
    pub fn connect(config: &WarehouseConfig) -> Result<Self, UploadError> {
        let token = resolve_token(config)?;
        let client = Client::builder().build()?;
        info!("Warehouse client ready");
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn insert_all_url(&self, table: &TableId) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.endpoint, table.project, table.dataset, table.table
        )
    }
}

fn resolve_token(config: &WarehouseConfig) -> Result<String, UploadError> {
    if let Some(token) = config.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }
    let Some(path) = &config.access_token_file else {
        return Err(UploadError::MissingCredentials);
    };
    let token = std::fs::read_to_string(path).map_err(|source| UploadError::CredentialsFile {
        path: path.clone(),
        source,
    })?;
    let token = token.trim();
    if token.is_empty() {
        return Err(UploadError::MissingCredentials);
    }
    Ok(token.to_string())
}

/// `tabledata.insertAll` request body. No `insertId` is sent: the table gets
/// plain append semantics.
fn insert_all_body(rows: &[WarehouseRow]) -> Value {
    let rows: Vec<Value> = rows.iter().map(|row| json!({ "json": row })).collect();
    json!({
        "kind": "bigquery#tableDataInsertAllRequest",
        "skipInvalidRows": false,
        "ignoreUnknownValues": false,
        "rows": rows,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowErrors>,
}

#[derive(Debug, Deserialize)]
struct RowErrors {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

fn check_insert_response(body: &str) -> Result<(), UploadError> {
    let response: InsertAllResponse = if body.trim().is_empty() {
        InsertAllResponse::default()
    } else {
        serde_json::from_str(body).map_err(|e| UploadError::Status {
            status: 200,
            body: format!("unparseable response ({e}): {}", truncate_for_log(body, 300)),
        })?
    };
    match response.insert_errors.first() {
        None => Ok(()),
        Some(first) => {
            let detail = first
                .errors
                .first()
                .map(|e| format!("{}: {}", e.reason, e.message))
                .unwrap_or_default();
            Err(UploadError::Rejected {
                rejected: response.insert_errors.len(),
                first: format!("row {} {}", first.index, detail),
            })
        }
    }
}

impl Warehouse for BigQueryClient {
    #[instrument(level = "info", skip_all, fields(%table, rows = rows.len()))]
    async fn append(
        &self,
        table: &TableId,
        rows: &[WarehouseRow],
    ) -> Result<AppendOutcome, UploadError> {
        if rows.is_empty() {
            info!("Nothing to append");
            return Ok(AppendOutcome {
                table: table.clone(),
                rows: 0,
            });
        }

        let t0 = Instant::now();
        let url = self.insert_all_url(table);
        debug!(%url, "Appending rows");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&insert_all_body(rows))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(%status, body = %truncate_for_log(&body, 300), "Warehouse refused request");
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        check_insert_response(&body)?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Rows appended"
        );
        Ok(AppendOutcome {
            table: table.clone(),
            rows: rows.len(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn row(title: &str) -> WarehouseRow {
        WarehouseRow {
            title: title.to_string(),
            kicker: Some("Casinos".to_string()),
            image: "https://example.com/i.jpg".to_string(),
            link: "https://example.com/a".to_string(),
            word_count: Some(1),
            character_count: Some(title.chars().count()),
            capitalized_words: Some(title.to_string()),
        }
    }

    #[test]
    fn test_table_id_parse() {
        let id: TableId = "my-project.scraping_dataset.noticias".parse().unwrap();
        assert_eq!(id.project, "my-project");
        assert_eq!(id.dataset, "scraping_dataset");
        assert_eq!(id.table, "noticias");
        assert_eq!(id.to_string(), "my-project.scraping_dataset.noticias");
    }

    #[test]
    fn test_table_id_rejects_bad_shapes() {
        for bad in ["", "noticias", "a.b", "a.b.c.d", "a..c"] {
            assert!(
                matches!(bad.parse::<TableId>(), Err(UploadError::InvalidTableId(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_connect_without_credentials_fails() {
        let err = BigQueryClient::connect(&WarehouseConfig::default()).unwrap_err();
        assert!(matches!(err, UploadError::MissingCredentials));
    }

    #[test]
    fn test_connect_with_missing_token_file_fails() {
        let config = WarehouseConfig {
            access_token_file: Some("/nonexistent/token".into()),
            ..WarehouseConfig::default()
        };
        let err = BigQueryClient::connect(&config).unwrap_err();
        assert!(matches!(err, UploadError::CredentialsFile { .. }));
    }

    #[test]
    fn test_connect_reads_token_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  ya29.token  ").unwrap();
        let config = WarehouseConfig {
            access_token_file: Some(file.path().to_path_buf()),
            endpoint: "https://bq.example.com/v2/".to_string(),
            ..WarehouseConfig::default()
        };
        let client = BigQueryClient::connect(&config).unwrap();
        assert_eq!(client.token, "ya29.token");
        let table: TableId = "p.d.t".parse().unwrap();
        assert_eq!(
            client.insert_all_url(&table),
            "https://bq.example.com/v2/projects/p/datasets/d/tables/t/insertAll"
        );
        assert!(!format!("{client:?}").contains("ya29"));
    }

    #[test]
    fn test_inline_token_wins_over_file() {
        let config = WarehouseConfig {
            access_token: Some("inline".to_string()),
            access_token_file: Some("/nonexistent/token".into()),
            ..WarehouseConfig::default()
        };
        assert_eq!(resolve_token(&config).unwrap(), "inline");
    }

    #[test]
    fn test_insert_all_body_shape() {
        let body = insert_all_body(&[row("Uno"), row("Dos")]);
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["json"]["Title"], "Uno");
        assert!(rows[0].get("insertId").is_none());
    }

    #[test]
    fn test_check_insert_response() {
        assert!(check_insert_response(r#"{"kind":"bigquery#tableDataInsertAllResponse"}"#).is_ok());
        assert!(check_insert_response("").is_ok());

        let rejected = r#"{"insertErrors":[{"index":1,"errors":[{"reason":"invalid","message":"no such field: Foo"}]}]}"#;
        match check_insert_response(rejected) {
            Err(UploadError::Rejected { rejected, first }) => {
                assert_eq!(rejected, 1);
                assert!(first.contains("no such field"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_append_skips_request() {
        let config = WarehouseConfig {
            access_token: Some("t".to_string()),
            endpoint: "http://127.0.0.1:9".to_string(),
            ..WarehouseConfig::default()
        };
        let client = BigQueryClient::connect(&config).unwrap();
        let table: TableId = "p.d.t".parse().unwrap();
        let outcome = client.append(&table, &[]).await.unwrap();
        assert_eq!(outcome.rows, 0);
    }
}
