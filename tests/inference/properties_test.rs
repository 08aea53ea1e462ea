use std::collections::HashSet;

use reltrack::inference::{merge, InferenceConfig, InferenceEngine, InferencePlan, NameCase, RelationshipKind};
use reltrack::metadata::{
    DataSource, QualifiedTable, RawForeignKeys, RawTableRow, RelationshipUsing, SourceKind,
    TrackedMetadata, TrackedRelationship, TrackedTable,
};

fn table(schema: &str, name: &str, columns: &[&str]) -> RawTableRow {
    let columns: Vec<String> = columns
        .iter()
        .map(|c| format!(r#"{{"column_name": "{}"}}"#, c))
        .collect();
    RawTableRow {
        table_schema: schema.to_string(),
        table_name: name.to_string(),
        table_type: "TABLE".to_string(),
        comment: None,
        columns: Some(format!("[{}]", columns.join(", "))),
    }
}

/// A small shop schema: competing keys, a composite key, a unique key, a
/// self reference, a cross-schema key and an untracked table.
fn shop_tables() -> Vec<RawTableRow> {
    vec![
        table("sales", "orders", &["id", "customer", "billing_customer_id", "shipping_customer_id"]),
        table("sales", "customers", &["id", "referrer_id"]),
        table("sales", "order_lines", &["order_id", "line_no", "product_id"]),
        table("sales", "shipments", &["id", "order_id", "line_no"]),
        table("sales", "customer_profiles", &["customer_id", "bio"]),
        table("inventory", "products", &["id", "name"]),
        table("staging", "imports", &["id", "customer_id"]),
    ]
}

const SHOP_FOREIGN_KEYS: &str = r#"[
    {"constraint_name": "fk_billing", "table_schema": "sales", "table_name": "orders",
     "ref_table_schema": "sales", "ref_table": "customers",
     "column_mapping": [{"column": "billing_customer_id", "referenced_column": "id"}]},
    {"constraint_name": "fk_shipping", "table_schema": "sales", "table_name": "orders",
     "ref_table_schema": "sales", "ref_table": "customers",
     "column_mapping": [{"column": "shipping_customer_id", "referenced_column": "id"}]},
    {"constraint_name": "fk_billing_copy", "table_schema": "sales", "table_name": "orders",
     "ref_table_schema": "sales", "ref_table": "customers",
     "column_mapping": [{"column": "billing_customer_id", "referenced_column": "id"}]},
    {"constraint_name": "fk_referrer", "table_schema": "sales", "table_name": "customers",
     "ref_table_schema": "sales", "ref_table": "customers",
     "column_mapping": [{"column": "referrer_id", "referenced_column": "id"}]},
    {"constraint_name": "fk_line_order", "table_schema": "sales", "table_name": "order_lines",
     "ref_table_schema": "sales", "ref_table": "orders",
     "column_mapping": [{"column": "order_id", "referenced_column": "id"}]},
    {"constraint_name": "fk_line_product", "table_schema": "sales", "table_name": "order_lines",
     "ref_table_schema": "inventory", "ref_table": "products",
     "column_mapping": [{"column": "product_id", "referenced_column": "id"}]},
    {"constraint_name": "fk_shipment_line", "table_schema": "sales", "table_name": "shipments",
     "ref_table_schema": "sales", "ref_table": "order_lines",
     "column_mapping": [{"column": "order_id", "referenced_column": "order_id"},
                        {"column": "line_no", "referenced_column": "line_no"}]},
    {"constraint_name": "fk_profile", "table_schema": "sales", "table_name": "customer_profiles",
     "ref_table_schema": "sales", "ref_table": "customers",
     "column_mapping": [{"column": "customer_id", "referenced_column": "id"}],
     "is_unique": true},
    {"constraint_name": "fk_import_customer", "table_schema": "staging", "table_name": "imports",
     "ref_table_schema": "sales", "ref_table": "customers",
     "column_mapping": [{"column": "customer_id", "referenced_column": "id"}]}
]"#;

fn shop_tracked() -> TrackedMetadata {
    let mut tables: Vec<TrackedTable> = [
        ("sales", "orders"),
        ("sales", "customers"),
        ("sales", "order_lines"),
        ("sales", "shipments"),
        ("sales", "customer_profiles"),
        ("inventory", "products"),
    ]
    .iter()
    .map(|(schema, name)| TrackedTable::bare(QualifiedTable::new(*schema, *name)))
    .collect();

    // An unrelated relationship whose name blocks the natural `orders` on customers.
    tables[1].array_relationships.push(
        serde_json::from_value(serde_json::json!({
            "name": "orders",
            "using": {"manual_configuration": {
                "column_mapping": {"id": "customer_id"},
                "remote_table": {"schema": "legacy", "name": "orders"}
            }}
        }))
        .unwrap(),
    );
    TrackedMetadata::new(tables)
}

fn engine(case: NameCase) -> InferenceEngine {
    InferenceEngine::with_config(
        DataSource::new("shop", SourceKind::Postgres),
        InferenceConfig {
            name_case: case,
            include_down_queries: false,
        },
    )
}

fn shop_plan(case: NameCase) -> InferencePlan {
    let snapshot = merge(&shop_tables(), &RawForeignKeys::new(SHOP_FOREIGN_KEYS), &shop_tracked());
    engine(case).plan(&snapshot)
}

#[test]
fn test_names_are_unique_per_table_and_avoid_existing_fields() {
    let snapshot = merge(&shop_tables(), &RawForeignKeys::new(SHOP_FOREIGN_KEYS), &shop_tracked());

    for case in [NameCase::Snake, NameCase::Camel] {
        let plan = engine(case).plan(&snapshot);
        for table_plan in &plan.tables {
            let table = snapshot.get(&table_plan.table).unwrap();
            let mut taken: HashSet<String> = table.columns.iter().map(|c| c.name.clone()).collect();
            taken.extend(table.object_relationships.iter().map(|r| r.name.clone()));
            taken.extend(table.array_relationships.iter().map(|r| r.name.clone()));

            for planned in &table_plan.relationships {
                assert!(
                    taken.insert(planned.name().to_string()),
                    "{} reuses field name {}",
                    table_plan.table,
                    planned.name()
                );
            }
        }
    }
}

#[test]
fn test_every_endpoint_is_tracked() {
    let tracked = shop_tracked();
    let plan = shop_plan(NameCase::Snake);

    assert!(!plan.is_empty());
    for planned in plan.relationships() {
        assert!(tracked.is_tracked(&planned.candidate.table));
        assert!(
            tracked.is_tracked(&planned.candidate.remote_table),
            "{} points at untracked {}",
            planned.name(),
            planned.candidate.remote_table
        );
    }
    assert!(plan
        .relationships()
        .all(|r| r.candidate.remote_table != QualifiedTable::new("staging", "imports")));
}

#[test]
fn test_duplicate_constraints_are_proposed_once() {
    let plan = shop_plan(NameCase::Snake);

    for table_plan in &plan.tables {
        let rels = &table_plan.relationships;
        for (i, a) in rels.iter().enumerate() {
            for b in &rels[i + 1..] {
                assert!(
                    !a.candidate.same_relationship(&b.candidate),
                    "{} and {} on {} are the same relationship",
                    a.name(),
                    b.name(),
                    table_plan.table
                );
            }
        }
    }

    let orders = plan.table(&QualifiedTable::new("sales", "orders")).unwrap();
    let objects = orders
        .relationships
        .iter()
        .filter(|r| r.candidate.kind == RelationshipKind::Object)
        .count();
    assert_eq!(objects, 2);
}

#[test]
fn test_competing_names_follow_resolution_order() {
    let plan = shop_plan(NameCase::Snake);

    let names = |schema: &str, name: &str| -> Vec<String> {
        plan.table(&QualifiedTable::new(schema, name))
            .unwrap()
            .relationships
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    };

    // `customer` is a column on orders.
    assert_eq!(
        names("sales", "orders"),
        vec![
            "customer_by_billing_customer_id",
            "customer_by_shipping_customer_id",
            "order_lines",
        ]
    );
    // Objects first: the self reference, then the unique profile key.
    // `orders` is already an existing relationship name.
    assert_eq!(
        names("sales", "customers"),
        vec![
            "customer",
            "customer_profile",
            "orders_by_id",
            "orders_by_id_1",
            "customers",
        ]
    );
    assert_eq!(names("sales", "order_lines"), vec!["order", "product", "shipments"]);
    assert_eq!(names("inventory", "products"), vec!["order_lines"]);
}

#[test]
fn test_planning_is_deterministic() {
    let snapshot = merge(&shop_tables(), &RawForeignKeys::new(SHOP_FOREIGN_KEYS), &shop_tracked());
    let engine = engine(NameCase::Snake);

    assert_eq!(engine.plan(&snapshot), engine.plan(&snapshot));
}

#[test]
fn test_applied_plan_leaves_nothing_to_do() {
    for case in [NameCase::Snake, NameCase::Camel] {
        let plan = shop_plan(case);
        let mut tracked = shop_tracked();

        for planned in plan.relationships() {
            let using: RelationshipUsing =
                serde_json::from_value(planned.up.args["using"].clone()).unwrap();
            let relationship = TrackedRelationship {
                name: planned.name().to_string(),
                using,
                comment: None,
            };
            let table = tracked
                .tables
                .iter_mut()
                .find(|t| t.table == planned.candidate.table)
                .unwrap();
            match planned.candidate.kind {
                RelationshipKind::Object => table.object_relationships.push(relationship),
                RelationshipKind::Array => table.array_relationships.push(relationship),
            }
        }

        let snapshot = merge(&shop_tables(), &RawForeignKeys::new(SHOP_FOREIGN_KEYS), &tracked);
        let replanned = engine(case).plan(&snapshot);
        assert!(
            replanned.is_empty(),
            "still planned: {:?}",
            replanned.relationships().map(|r| r.name()).collect::<Vec<_>>()
        );
    }
}
