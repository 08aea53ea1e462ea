//! Wire types exchanged with the schema source and the metadata store.
//!
//! Raw introspection rows are kept close to what `run_sql` returns: the
//! column list and the foreign-key set still carry their embedded JSON and
//! are only parsed by the schema merger. Tracked metadata mirrors the
//! `export_metadata` document.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// A table reference as `schema.name`.
///
/// Serialized fields are kept in alphabetical order so request bodies render
/// identically whether or not JSON maps preserve insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QualifiedTable {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub schema: String,
}

impl QualifiedTable {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.schema, self.name)
        }
    }
}

// Metadata accepts both `"orders"` and `{"schema": "dbo", "name": "orders"}`.
impl<'de> Deserialize<'de> for QualifiedTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Full {
                #[serde(default)]
                schema: Option<String>,
                name: String,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bare(name) => QualifiedTable::new("", name),
            Repr::Full { schema, name } => QualifiedTable::new(schema.unwrap_or_default(), name),
        })
    }
}

/// Kind of database behind a metadata source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Mssql,
    #[serde(alias = "pg")]
    Postgres,
}

impl SourceKind {
    /// Name used for this kind in exported metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mssql => "mssql",
            Self::Postgres => "postgres",
        }
    }

    /// Prefix of metadata API request types (`mssql_track_table`, `pg_track_table`).
    pub fn metadata_prefix(&self) -> &'static str {
        match self {
            Self::Mssql => "mssql",
            Self::Postgres => "pg",
        }
    }

    /// Request type for raw SQL on the `/v2/query` endpoint.
    pub fn run_sql_type(&self) -> &'static str {
        match self {
            Self::Mssql => "mssql_run_sql",
            Self::Postgres => "run_sql",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mssql" | "sqlserver" => Ok(Self::Mssql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(format!("unknown source kind: {}", other)),
        }
    }
}

/// A named data source registered in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    pub kind: SourceKind,
}

impl DataSource {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Build a metadata request type with this source's prefix.
    pub fn request_type(&self, operation: &str) -> String {
        format!("{}_{}", self.kind.metadata_prefix(), operation)
    }
}

// ============================================================================
// Raw introspection rows
// ============================================================================

/// One table or view as returned by the table introspection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTableRow {
    pub table_schema: String,
    pub table_name: String,
    pub table_type: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// Embedded JSON array of column descriptions (`NULL` for column-less objects).
    #[serde(default)]
    pub columns: Option<String>,
}

impl RawTableRow {
    pub fn qualified_name(&self) -> QualifiedTable {
        QualifiedTable::new(self.table_schema.clone(), self.table_name.clone())
    }
}

/// The foreign-key result set: a single embedded JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawForeignKeys {
    pub json: String,
}

impl RawForeignKeys {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

// ============================================================================
// Tracked metadata
// ============================================================================

/// Top level of an `export_metadata` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataExport {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub sources: Vec<SourceMetadata>,
}

impl MetadataExport {
    /// Pick the tracked tables of one source, matched by name and kind.
    pub fn into_tracked(self, source: &DataSource) -> Option<TrackedMetadata> {
        self.sources
            .into_iter()
            .find(|s| s.name == source.name && s.kind.parse::<SourceKind>() == Ok(source.kind))
            .map(|s| TrackedMetadata { tables: s.tables })
    }
}

/// One source entry of the exported metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceMetadata {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub tables: Vec<TrackedTable>,
}

/// The tracked tables of a single source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedMetadata {
    pub tables: Vec<TrackedTable>,
}

impl TrackedMetadata {
    pub fn new(tables: Vec<TrackedTable>) -> Self {
        Self { tables }
    }

    pub fn is_tracked(&self, table: &QualifiedTable) -> bool {
        self.tables.iter().any(|t| &t.table == table)
    }
}

/// A tracked table with its relationships and permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTable {
    pub table: QualifiedTable,
    #[serde(default)]
    pub object_relationships: Vec<TrackedRelationship>,
    #[serde(default)]
    pub array_relationships: Vec<TrackedRelationship>,
    #[serde(default)]
    pub insert_permissions: Vec<PermissionEntry>,
    #[serde(default)]
    pub select_permissions: Vec<PermissionEntry>,
    #[serde(default)]
    pub update_permissions: Vec<PermissionEntry>,
    #[serde(default)]
    pub delete_permissions: Vec<PermissionEntry>,
}

impl TrackedTable {
    /// A tracked table with no relationships or permissions.
    pub fn bare(table: QualifiedTable) -> Self {
        Self {
            table,
            object_relationships: Vec::new(),
            array_relationships: Vec::new(),
            insert_permissions: Vec::new(),
            select_permissions: Vec::new(),
            update_permissions: Vec::new(),
            delete_permissions: Vec::new(),
        }
    }
}

/// A role's permission grant. The permission body (columns, filter, check)
/// is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub role: String,
    pub permission: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// An object or array relationship already registered in metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRelationship {
    pub name: String,
    pub using: RelationshipUsing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// How a relationship is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipUsing {
    /// Defined through a foreign-key constraint.
    ForeignKeyConstraintOn(ForeignKeyOn),
    /// Defined through an explicit column mapping.
    ManualConfiguration(ManualConfiguration),
}

/// The `foreign_key_constraint_on` payload.
///
/// Object relationships usually name the local column directly; array
/// relationships name the remote table and its column(s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForeignKeyOn {
    Column(String),
    Spec(ForeignKeyOnSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyOnSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<QualifiedTable>,
}

impl ForeignKeyOn {
    /// The columns this definition names.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Column(column) => vec![column.as_str()],
            Self::Spec(spec) => spec
                .column
                .iter()
                .chain(spec.columns.iter())
                .map(String::as_str)
                .collect(),
        }
    }

    /// The remote table, when the constraint lives on the other side.
    pub fn table(&self) -> Option<&QualifiedTable> {
        match self {
            Self::Column(_) => None,
            Self::Spec(spec) => spec.table.as_ref(),
        }
    }
}

/// The `manual_configuration` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualConfiguration {
    /// This table's column → remote table's column.
    pub column_mapping: BTreeMap<String, String>,
    pub remote_table: QualifiedTable,
}

// ============================================================================
// Metadata requests
// ============================================================================

/// A request body for the metadata API (`{"type": ..., "args": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataQuery {
    #[serde(rename = "type")]
    pub query_type: String,
    pub args: serde_json::Value,
}

impl MetadataQuery {
    pub fn new(query_type: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            query_type: query_type.into(),
            args,
        }
    }
}
