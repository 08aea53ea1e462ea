//! GraphQL engine HTTP client.
//!
//! Implements the three collaborators against a running engine:
//!
//! - `POST /v2/query` with `run_sql` for table and foreign-key introspection;
//! - `POST /v1/metadata` with `export_metadata` for the tracked metadata;
//! - `POST /v1/metadata` with the generated request for submissions.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::error::{MetadataError, MetadataResult};
use super::provider::{MetadataSink, MetadataStore, SchemaSource};
use super::sql;
use super::types::{DataSource, MetadataExport, MetadataQuery, RawForeignKeys, RawTableRow, TrackedMetadata};

/// Default HTTP request timeout (in seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

/// Client for one data source of a GraphQL engine.
///
/// # Example
///
/// ```ignore
/// use reltrack::metadata::{introspect, DataSource, GraphqlEngineClient, SourceKind};
///
/// let client = GraphqlEngineClient::new(
///     "http://localhost:8080",
///     DataSource::new("bikes", SourceKind::Mssql),
/// )?
/// .with_admin_secret("secret");
///
/// let snapshot = introspect(&client, &client).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GraphqlEngineClient {
    endpoint: String,
    admin_secret: Option<String>,
    source: DataSource,
    client: reqwest::Client,
}

/// `run_sql` response body.
#[derive(Debug, Deserialize)]
struct RunSqlResponse {
    result_type: String,
    #[serde(default)]
    result: Option<Vec<Vec<Value>>>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

impl GraphqlEngineClient {
    /// Create a client with the default timeout.
    pub fn new(endpoint: impl Into<String>, source: DataSource) -> MetadataResult<Self> {
        Self::with_timeout(endpoint, source, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        source: DataSource,
        timeout: Duration,
    ) -> MetadataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MetadataError::Client)?;
        Ok(Self {
            endpoint: endpoint.into(),
            admin_secret: None,
            source,
            client,
        })
    }

    /// Authenticate every request with the admin secret.
    pub fn with_admin_secret(mut self, secret: impl Into<String>) -> Self {
        self.admin_secret = Some(secret.into());
        self
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn query_url(&self) -> String {
        format!("{}/v2/query", self.endpoint.trim_end_matches('/'))
    }

    fn metadata_url(&self) -> String {
        format!("{}/v1/metadata", self.endpoint.trim_end_matches('/'))
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> MetadataResult<Value> {
        let mut request = self.client.post(url).json(body);
        if let Some(secret) = &self.admin_secret {
            request = request.header(ADMIN_SECRET_HEADER, secret);
        }

        let transport = |source: reqwest::Error| MetadataError::Transport {
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<EngineErrorBody>(&text) {
                Ok(body) => MetadataError::remote(
                    status.as_u16(),
                    body.code.unwrap_or_else(|| "unexpected".to_string()),
                    body.error,
                ),
                Err(_) => MetadataError::remote(status.as_u16(), "unexpected", text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Run a read-only SQL statement and return its data rows (header dropped).
    async fn run_sql(&self, statement: &str) -> MetadataResult<Vec<Vec<Value>>> {
        let body = json!({
            "type": self.source.kind.run_sql_type(),
            "args": {
                "source": self.source.name,
                "sql": statement,
                "cascade": false,
                "read_only": true,
            }
        });
        let response: RunSqlResponse = serde_json::from_value(self.post(&self.query_url(), &body).await?)?;
        debug!(result_type = %response.result_type, "run_sql completed");

        Ok(response
            .result
            .map(|rows| rows.into_iter().skip(1).collect())
            .unwrap_or_default())
    }
}

/// A result cell as text; `NULL` stays `None`.
fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn table_row(row: &[Value]) -> MetadataResult<RawTableRow> {
    let text = |i: usize| row.get(i).and_then(cell_text);
    let required = |i: usize, what: &str| {
        text(i).ok_or_else(|| MetadataError::UnexpectedResponse(format!("table row without {}", what)))
    };

    Ok(RawTableRow {
        table_schema: required(0, "schema")?,
        table_name: required(1, "name")?,
        table_type: text(2).unwrap_or_default(),
        comment: text(3),
        columns: text(4),
    })
}

#[async_trait]
impl SchemaSource for GraphqlEngineClient {
    async fn fetch_tables(&self) -> MetadataResult<Vec<RawTableRow>> {
        let rows = self.run_sql(sql::tables_query(self.source.kind)).await?;
        rows.iter().map(|row| table_row(row)).collect()
    }

    async fn fetch_foreign_keys(&self) -> MetadataResult<RawForeignKeys> {
        let rows = self.run_sql(sql::foreign_keys_query(self.source.kind)).await?;
        // FOR JSON splits long documents over several rows.
        let json: String = rows
            .iter()
            .filter_map(|row| row.first().and_then(cell_text))
            .collect();
        Ok(RawForeignKeys::new(json))
    }
}

#[async_trait]
impl MetadataStore for GraphqlEngineClient {
    async fn fetch_tracked(&self) -> MetadataResult<TrackedMetadata> {
        let body = json!({ "type": "export_metadata", "args": {} });
        let export: MetadataExport = serde_json::from_value(self.post(&self.metadata_url(), &body).await?)?;

        match export.into_tracked(&self.source) {
            Some(tracked) => Ok(tracked),
            None => {
                warn!(
                    source = %self.source.name,
                    kind = %self.source.kind,
                    "source not found in metadata; treating every table as untracked"
                );
                Ok(TrackedMetadata::default())
            }
        }
    }
}

#[async_trait]
impl MetadataSink for GraphqlEngineClient {
    async fn submit(&self, query: &MetadataQuery) -> MetadataResult<Value> {
        debug!(query_type = %query.query_type, "submitting metadata request");
        self.post(&self.metadata_url(), query).await
    }
}
