//! Collaborator traits and run orchestration.
//!
//! The inference core only sees already-fetched data. These traits describe
//! where that data comes from and where generated requests go; the free
//! functions sequence the calls around a planning run.

use std::sync::LazyLock;

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use super::error::{MetadataError, MetadataResult};
use super::types::{DataSource, MetadataQuery, QualifiedTable, RawForeignKeys, RawTableRow, TrackedMetadata};
use crate::inference::{merge, InferencePlan, SchemaSnapshot, TablePlan};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Raw table and foreign-key introspection.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Every table and view with its embedded column list.
    async fn fetch_tables(&self) -> MetadataResult<Vec<RawTableRow>>;

    /// Every foreign-key constraint, as one JSON document.
    async fn fetch_foreign_keys(&self) -> MetadataResult<RawForeignKeys>;
}

/// The current tracked-metadata document.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Tracked tables of the configured source. A source that is not
    /// registered yet has no tracked tables.
    async fn fetch_tracked(&self) -> MetadataResult<TrackedMetadata>;
}

/// Accepts metadata requests one at a time.
#[async_trait]
pub trait MetadataSink: Send + Sync {
    async fn submit(&self, query: &MetadataQuery) -> MetadataResult<serde_json::Value>;
}

/// Fetch tables, foreign keys and tracked metadata, in that order, and
/// merge them.
pub async fn introspect<S, M>(source: &S, store: &M) -> MetadataResult<SchemaSnapshot>
where
    S: SchemaSource + ?Sized,
    M: MetadataStore + ?Sized,
{
    let tables = source.fetch_tables().await?;
    let foreign_keys = source.fetch_foreign_keys().await?;
    let tracked = store.fetch_tracked().await?;

    let snapshot = merge(&tables, &foreign_keys, &tracked);
    info!(
        tables = snapshot.len(),
        tracked = tracked.tables.len(),
        "introspected schema"
    );
    Ok(snapshot)
}

/// A request the sink accepted.
#[derive(Debug)]
pub struct AppliedRequest {
    pub table: QualifiedTable,
    /// Relationship name, or the table name for tracking requests.
    pub name: String,
    pub response: serde_json::Value,
}

/// A request the sink rejected.
#[derive(Debug)]
pub struct FailedRequest {
    pub table: QualifiedTable,
    pub name: String,
    pub error: MetadataError,
}

/// Outcome of submitting a batch of requests.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<AppliedRequest>,
    pub failed: Vec<FailedRequest>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn absorb(&mut self, other: ApplyReport) {
        self.applied.extend(other.applied);
        self.failed.extend(other.failed);
    }

    fn record(&mut self, table: &QualifiedTable, name: &str, result: MetadataResult<serde_json::Value>) {
        match result {
            Ok(response) => self.applied.push(AppliedRequest {
                table: table.clone(),
                name: name.to_string(),
                response,
            }),
            Err(error) => {
                warn!(table = %table, name = %name, error = %error, "request rejected");
                self.failed.push(FailedRequest {
                    table: table.clone(),
                    name: name.to_string(),
                    error,
                });
            }
        }
    }
}

/// Submit every `up` request of the plan.
///
/// Requests of one table go out one after the other, in resolution order;
/// different tables are submitted concurrently. Failures are collected, not
/// retried, and do not stop the remaining requests.
pub async fn apply_plan<K>(sink: &K, plan: &InferencePlan) -> ApplyReport
where
    K: MetadataSink + ?Sized,
{
    let reports = join_all(plan.tables.iter().map(|t| apply_table(sink, t))).await;

    let mut report = ApplyReport::default();
    for r in reports {
        report.absorb(r);
    }
    info!(
        applied = report.applied.len(),
        failed = report.failed.len(),
        "applied relationship plan"
    );
    report
}

async fn apply_table<K>(sink: &K, plan: &TablePlan) -> ApplyReport
where
    K: MetadataSink + ?Sized,
{
    let mut report = ApplyReport::default();
    for planned in &plan.relationships {
        let result = sink.submit(&planned.up).await;
        report.record(&plan.table, planned.name(), result);
    }
    report
}

/// The `<prefix>_track_table` request for a table.
///
/// Names with characters GraphQL does not allow get a sanitized
/// `custom_name` (`order lines` → `order_lines`). GraphQL names are ASCII,
/// so every other character is replaced, letters included.
pub fn track_table_query(source: &DataSource, table: &QualifiedTable) -> MetadataQuery {
    let custom_name = NON_WORD.replace_all(&table.name, "_");
    let args = if custom_name == table.name {
        json!({
            "source": source.name,
            "table": table,
        })
    } else {
        json!({
            "configuration": { "custom_name": custom_name },
            "source": source.name,
            "table": table,
        })
    };
    MetadataQuery::new(source.request_type("track_table"), args)
}

/// Track every table of the snapshot that is not tracked yet.
pub async fn track_untracked_tables<K>(
    sink: &K,
    snapshot: &SchemaSnapshot,
    source: &DataSource,
) -> ApplyReport
where
    K: MetadataSink + ?Sized,
{
    let requests: Vec<(QualifiedTable, MetadataQuery)> = snapshot
        .untracked()
        .map(|t| (t.table.clone(), track_table_query(source, &t.table)))
        .collect();

    let results = join_all(requests.iter().map(|(_, query)| sink.submit(query))).await;

    let mut report = ApplyReport::default();
    for ((table, _), result) in requests.iter().zip(results) {
        report.record(table, &table.name, result);
    }
    info!(
        tracked = report.applied.len(),
        failed = report.failed.len(),
        "tracked untracked tables"
    );
    report
}
