//! Schema merger.
//!
//! Combines the raw table rows and the foreign-key document returned by the
//! schema source with the tracked-metadata document into one [`TableSchema`]
//! per table. Malformed JSON is logged and the affected unit is dropped;
//! merging never fails as a whole.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::error::ParseError;
use super::schema::{Column, ForeignKeyConstraint, SchemaSnapshot, TablePermissions, TableSchema};
use crate::metadata::{QualifiedTable, RawForeignKeys, RawTableRow, TrackedMetadata, TrackedTable};

/// Merge raw introspection rows with tracked metadata.
pub fn merge(
    tables: &[RawTableRow],
    foreign_keys: &RawForeignKeys,
    tracked: &TrackedMetadata,
) -> SchemaSnapshot {
    let foreign_keys = match parse_foreign_keys(foreign_keys) {
        Ok(fks) => fks,
        Err(e) => {
            warn!(error = %e, "ignoring foreign keys; no relationships will be inferred");
            Vec::new()
        }
    };
    merge_parsed(tables, foreign_keys, tracked)
}

/// Merge with an already-parsed foreign-key list.
pub fn merge_parsed(
    tables: &[RawTableRow],
    mut foreign_keys: Vec<ForeignKeyConstraint>,
    tracked: &TrackedMetadata,
) -> SchemaSnapshot {
    let tracked_names: HashSet<&QualifiedTable> = tracked.tables.iter().map(|t| &t.table).collect();
    let tracked_by_name: HashMap<&QualifiedTable, &TrackedTable> =
        tracked.tables.iter().map(|t| (&t.table, t)).collect();

    for fk in &mut foreign_keys {
        fk.is_table_tracked = tracked_names.contains(&fk.table());
        fk.is_ref_table_tracked = tracked_names.contains(&fk.ref_table());
    }

    let mut merged = Vec::with_capacity(tables.len());
    for row in tables {
        let name = row.qualified_name();
        let columns = match parse_columns(row) {
            Ok(columns) => columns,
            Err(e) => {
                warn!(table = %name, error = %e, "skipping table with unreadable columns");
                continue;
            }
        };

        let outgoing: Vec<ForeignKeyConstraint> = foreign_keys
            .iter()
            .filter(|fk| fk.is_owned_by(&name))
            .cloned()
            .collect();
        let opposite: Vec<ForeignKeyConstraint> = foreign_keys
            .iter()
            .filter(|fk| fk.references(&name) && fk.is_table_tracked)
            .cloned()
            .collect();

        let entry = tracked_by_name.get(&name).copied();
        debug!(
            table = %name,
            tracked = entry.is_some(),
            outgoing = outgoing.len(),
            incoming = opposite.len(),
            "merged table"
        );

        merged.push(TableSchema {
            table: name,
            table_type: row.table_type.clone(),
            comment: row.comment.clone(),
            columns,
            foreign_keys: outgoing,
            opposite_foreign_keys: opposite,
            is_table_tracked: entry.is_some(),
            object_relationships: entry
                .map(|t| t.object_relationships.clone())
                .unwrap_or_default(),
            array_relationships: entry
                .map(|t| t.array_relationships.clone())
                .unwrap_or_default(),
            permissions: entry.map(permissions_of).unwrap_or_default(),
        });
    }

    SchemaSnapshot::new(merged)
}

/// Parse the foreign-key document. A blank document is an empty set.
pub fn parse_foreign_keys(raw: &RawForeignKeys) -> Result<Vec<ForeignKeyConstraint>, ParseError> {
    let json = raw.json.trim();
    if json.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json).map_err(ParseError::ForeignKeys)
}

/// Parse a table row's embedded column list. `NULL` or blank means no columns.
pub fn parse_columns(row: &RawTableRow) -> Result<Vec<Column>, ParseError> {
    let json = row.columns.as_deref().map(str::trim).unwrap_or_default();
    if json.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json).map_err(|source| ParseError::Columns {
        table: row.qualified_name(),
        source,
    })
}

fn permissions_of(table: &TrackedTable) -> TablePermissions {
    TablePermissions {
        insert: table.insert_permissions.clone(),
        select: table.select_permissions.clone(),
        update: table.update_permissions.clone(),
        delete: table.delete_permissions.clone(),
    }
}
