use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use reltrack::inference::{merge, InferenceEngine};
use reltrack::metadata::{
    apply_plan, introspect, track_untracked_tables, DataSource, MetadataError, MetadataQuery,
    MetadataResult, MetadataSink, MetadataStore, QualifiedTable, RawForeignKeys, RawTableRow,
    SchemaSource, SourceKind, TrackedMetadata, TrackedTable,
};
use serde_json::{json, Value};

fn row(name: &str, columns: &str) -> RawTableRow {
    RawTableRow {
        table_schema: "dbo".to_string(),
        table_name: name.to_string(),
        table_type: "TABLE".to_string(),
        comment: None,
        columns: Some(columns.to_string()),
    }
}

const FOREIGN_KEYS: &str = r#"[
    {"constraint_name": "fk_billing", "table_schema": "dbo", "table_name": "orders",
     "ref_table_schema": "dbo", "ref_table": "customers",
     "column_mapping": [{"column": "billing_customer_id", "referenced_column": "id"}]},
    {"constraint_name": "fk_shipping", "table_schema": "dbo", "table_name": "orders",
     "ref_table_schema": "dbo", "ref_table": "customers",
     "column_mapping": [{"column": "shipping_customer_id", "referenced_column": "id"}]}
]"#;

/// In-memory schema source and metadata store recording call order.
struct FakeEngine {
    tables: Vec<RawTableRow>,
    foreign_keys: RawForeignKeys,
    tracked: TrackedMetadata,
    fail_tracked: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeEngine {
    fn new(tracked: &[&str]) -> Self {
        Self {
            tables: vec![
                row(
                    "orders",
                    r#"[{"column_name": "id"}, {"column_name": "billing_customer_id"}, {"column_name": "shipping_customer_id"}]"#,
                ),
                row("customers", r#"[{"column_name": "id"}]"#),
                row("order notes", r#"[{"column_name": "id"}]"#),
            ],
            foreign_keys: RawForeignKeys::new(FOREIGN_KEYS),
            tracked: TrackedMetadata::new(
                tracked
                    .iter()
                    .map(|n| TrackedTable::bare(QualifiedTable::new("dbo", *n)))
                    .collect(),
            ),
            fail_tracked: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaSource for FakeEngine {
    async fn fetch_tables(&self) -> MetadataResult<Vec<RawTableRow>> {
        self.calls.lock().unwrap().push("tables");
        Ok(self.tables.clone())
    }

    async fn fetch_foreign_keys(&self) -> MetadataResult<RawForeignKeys> {
        self.calls.lock().unwrap().push("foreign_keys");
        Ok(self.foreign_keys.clone())
    }
}

#[async_trait]
impl MetadataStore for FakeEngine {
    async fn fetch_tracked(&self) -> MetadataResult<TrackedMetadata> {
        self.calls.lock().unwrap().push("tracked");
        if self.fail_tracked {
            return Err(MetadataError::remote(500, "unexpected", "metadata unavailable"));
        }
        Ok(self.tracked.clone())
    }
}

/// Sink that records submissions and rejects configured names.
#[derive(Default)]
struct RecordingSink {
    submitted: Mutex<Vec<MetadataQuery>>,
    reject: HashSet<String>,
}

impl RecordingSink {
    fn rejecting(names: &[&str]) -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            reject: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn submitted(&self) -> Vec<MetadataQuery> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataSink for RecordingSink {
    async fn submit(&self, query: &MetadataQuery) -> MetadataResult<Value> {
        self.submitted.lock().unwrap().push(query.clone());
        let name = query.args["name"]
            .as_str()
            .or_else(|| query.args["table"]["name"].as_str())
            .unwrap_or_default();
        if self.reject.contains(name) {
            return Err(MetadataError::remote(400, "already-exists", format!("{} already exists", name)));
        }
        Ok(json!({"message": "success"}))
    }
}

fn source() -> DataSource {
    DataSource::new("bikes", SourceKind::Mssql)
}

#[tokio::test]
async fn test_introspect_fetches_in_order() {
    let engine = FakeEngine::new(&["orders", "customers"]);
    let snapshot = introspect(&engine, &engine).await.unwrap();

    assert_eq!(engine.calls(), vec!["tables", "foreign_keys", "tracked"]);
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot.is_tracked(&QualifiedTable::new("dbo", "orders")));
    assert!(!snapshot.is_tracked(&QualifiedTable::new("dbo", "order notes")));
}

#[tokio::test]
async fn test_introspect_propagates_collaborator_errors() {
    let mut engine = FakeEngine::new(&["orders"]);
    engine.fail_tracked = true;

    let err = introspect(&engine, &engine).await.unwrap_err();
    assert!(matches!(err, MetadataError::Remote { status: 500, .. }));
}

#[tokio::test]
async fn test_apply_plan_keeps_table_order() {
    let engine = FakeEngine::new(&["orders", "customers"]);
    let snapshot = introspect(&engine, &engine).await.unwrap();
    let plan = InferenceEngine::new(source()).plan(&snapshot);

    let sink = RecordingSink::default();
    let report = apply_plan(&sink, &plan).await;

    assert!(report.is_success());
    assert_eq!(report.applied.len(), 4);

    let names_on = |table: &str| -> Vec<String> {
        sink.submitted()
            .iter()
            .filter(|q| q.args["table"]["name"] == table)
            .map(|q| q.args["name"].as_str().unwrap_or_default().to_string())
            .collect()
    };
    assert_eq!(names_on("orders"), vec!["customer", "customer_by_shipping_customer_id"]);
    assert_eq!(names_on("customers"), vec!["orders", "orders_by_id"]);
}

#[tokio::test]
async fn test_apply_plan_collects_failures_and_continues() {
    let engine = FakeEngine::new(&["orders", "customers"]);
    let snapshot = introspect(&engine, &engine).await.unwrap();
    let plan = InferenceEngine::new(source()).plan(&snapshot);

    let sink = RecordingSink::rejecting(&["customer"]);
    let report = apply_plan(&sink, &plan).await;

    assert!(!report.is_success());
    assert_eq!(sink.submitted().len(), 4);
    assert_eq!(report.applied.len(), 3);
    assert_eq!(report.failed.len(), 1);

    let failed = &report.failed[0];
    assert_eq!(failed.table, QualifiedTable::new("dbo", "orders"));
    assert_eq!(failed.name, "customer");
    assert!(failed.error.is_already_exists());
}

#[tokio::test]
async fn test_apply_empty_plan_submits_nothing() {
    let engine = FakeEngine::new(&[]);
    let snapshot = introspect(&engine, &engine).await.unwrap();
    let plan = InferenceEngine::new(source()).plan(&snapshot);

    let sink = RecordingSink::default();
    let report = apply_plan(&sink, &plan).await;

    assert!(plan.is_empty());
    assert!(report.is_success());
    assert!(sink.submitted().is_empty());
}

#[tokio::test]
async fn test_track_untracked_tables() {
    let tables = FakeEngine::new(&["orders"]).tables;
    let snapshot = merge(
        &tables,
        &RawForeignKeys::new(FOREIGN_KEYS),
        &TrackedMetadata::new(vec![TrackedTable::bare(QualifiedTable::new("dbo", "orders"))]),
    );

    let sink = RecordingSink::rejecting(&["customers"]);
    let report = track_untracked_tables(&sink, &snapshot, &source()).await;

    let mut submitted = sink.submitted();
    submitted.sort_by(|a, b| a.args["table"]["name"].as_str().cmp(&b.args["table"]["name"].as_str()));
    assert_eq!(submitted.len(), 2);
    assert!(submitted.iter().all(|q| q.query_type == "mssql_track_table"));

    assert_eq!(submitted[0].args["table"], json!({"schema": "dbo", "name": "customers"}));
    assert!(submitted[0].args.get("configuration").is_none());
    assert_eq!(submitted[1].args["table"]["name"], "order notes");
    assert_eq!(submitted[1].args["configuration"]["custom_name"], "order_notes");

    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.applied[0].name, "order notes");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].table, QualifiedTable::new("dbo", "customers"));
}
