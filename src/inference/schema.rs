//! Merged per-table schema records.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::metadata::{PermissionEntry, QualifiedTable, TrackedRelationship};

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(rename = "column_name")]
    pub name: String,
    #[serde(default)]
    pub ordinal_position: Option<i64>,
    #[serde(default, rename = "column_default")]
    pub default: Option<String>,
    #[serde(default, rename = "collation_name")]
    pub collation: Option<String>,
    #[serde(default, deserialize_with = "yes_no")]
    pub is_nullable: bool,
    /// Type category (`OTHER`, `USER-DEFINED`, ...).
    #[serde(default)]
    pub data_type: Option<String>,
    /// Declared type name (`int`, `nvarchar`, ...).
    #[serde(default)]
    pub data_type_name: Option<String>,
}

/// One local → referenced column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub column: String,
    pub referenced_column: String,
}

/// A foreign-key constraint, annotated with the tracking status of both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    pub constraint_name: String,
    pub table_schema: String,
    pub table_name: String,
    pub ref_table_schema: String,
    pub ref_table: String,
    /// Ordered column pairs; local and referenced lists are positional.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub column_mapping: Vec<ColumnPair>,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
    /// The owning table's FK columns are covered by a unique constraint or
    /// index, so at most one row references each target row.
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_unique: bool,
    #[serde(default, skip_deserializing)]
    pub is_table_tracked: bool,
    #[serde(default, skip_deserializing)]
    pub is_ref_table_tracked: bool,
}

impl ForeignKeyConstraint {
    /// The table that owns the constraint.
    pub fn table(&self) -> QualifiedTable {
        QualifiedTable::new(self.table_schema.clone(), self.table_name.clone())
    }

    /// The table the constraint references.
    pub fn ref_table(&self) -> QualifiedTable {
        QualifiedTable::new(self.ref_table_schema.clone(), self.ref_table.clone())
    }

    pub fn is_owned_by(&self, table: &QualifiedTable) -> bool {
        self.table_schema == table.schema && self.table_name == table.name
    }

    pub fn references(&self, table: &QualifiedTable) -> bool {
        self.ref_table_schema == table.schema && self.ref_table == table.name
    }

    /// Local columns, in constraint order.
    pub fn columns(&self) -> Vec<String> {
        self.column_mapping.iter().map(|p| p.column.clone()).collect()
    }

    /// Referenced columns, in constraint order.
    pub fn referenced_columns(&self) -> Vec<String> {
        self.column_mapping
            .iter()
            .map(|p| p.referenced_column.clone())
            .collect()
    }
}

/// Per-role permission grants of a tracked table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TablePermissions {
    pub insert: Vec<PermissionEntry>,
    pub select: Vec<PermissionEntry>,
    pub update: Vec<PermissionEntry>,
    pub delete: Vec<PermissionEntry>,
}

impl TablePermissions {
    /// Roles holding at least one grant, sorted and deduplicated.
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self
            .insert
            .iter()
            .chain(&self.select)
            .chain(&self.update)
            .chain(&self.delete)
            .map(|p| p.role.as_str())
            .collect();
        roles.sort_unstable();
        roles.dedup();
        roles
    }
}

/// One table or view merged from introspection and tracked metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub table: QualifiedTable,
    pub table_type: String,
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    /// Constraints owned by this table.
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    /// Constraints of tracked tables that reference this table.
    pub opposite_foreign_keys: Vec<ForeignKeyConstraint>,
    pub is_table_tracked: bool,
    pub object_relationships: Vec<TrackedRelationship>,
    pub array_relationships: Vec<TrackedRelationship>,
    pub permissions: TablePermissions,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Read-only set of merged tables for one inference run, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    tables: Vec<TableSchema>,
    index: HashMap<QualifiedTable, usize>,
}

impl SchemaSnapshot {
    /// Build a snapshot; the first record of a duplicated table wins.
    pub fn new(tables: Vec<TableSchema>) -> Self {
        let mut kept = Vec::with_capacity(tables.len());
        let mut index = HashMap::with_capacity(tables.len());
        for table in tables {
            if index.contains_key(&table.table) {
                continue;
            }
            index.insert(table.table.clone(), kept.len());
            kept.push(table);
        }
        Self {
            tables: kept,
            index,
        }
    }

    pub fn get(&self, table: &QualifiedTable) -> Option<&TableSchema> {
        self.index.get(table).map(|&i| &self.tables[i])
    }

    pub fn contains(&self, table: &QualifiedTable) -> bool {
        self.index.contains_key(table)
    }

    pub fn is_tracked(&self, table: &QualifiedTable) -> bool {
        self.get(table).is_some_and(|t| t.is_table_tracked)
    }

    /// Tables in introspection order.
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    pub fn untracked(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter().filter(|t| !t.is_table_tracked)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn yes_no<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Flag(bool),
        Text(String),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Flag(b)) => b,
        Some(Repr::Text(s)) => s.eq_ignore_ascii_case("yes"),
        None => false,
    })
}

// FOR JSON renders `bit` as true/false, but some drivers hand back 0/1.
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Flag(bool),
        Number(i64),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Flag(b)) => b,
        Some(Repr::Number(n)) => n != 0,
        None => false,
    })
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ColumnPair>, D::Error> {
    Ok(Option::<Vec<ColumnPair>>::deserialize(deserializer)?.unwrap_or_default())
}
