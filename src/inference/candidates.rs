//! Candidate generation.
//!
//! Walks a table's outgoing and incoming foreign keys and proposes the
//! object and array relationships that are not registered yet.
//!
//! | FK side  | referenced / owning side unique | proposal          |
//! |----------|----------------------------------|-------------------|
//! | outgoing | any                              | object            |
//! | incoming | owning columns unique            | object (reverse)  |
//! | incoming | otherwise                        | array             |

use serde::Serialize;
use tracing::debug;

use super::existing::ExistingRelationships;
use super::schema::{ForeignKeyConstraint, SchemaSnapshot, TableSchema};
use crate::metadata::QualifiedTable;

/// Object (to-one) or array (to-many) relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Object,
    Array,
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
        }
    }
}

/// Which side of the foreign key the relationship is declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Declared on the table that owns the foreign key.
    Outgoing,
    /// Declared on the referenced table.
    Incoming,
}

/// A proposed relationship that is not tracked yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipCandidate {
    pub kind: RelationshipKind,
    pub direction: Direction,
    /// Table the relationship is created on.
    pub table: QualifiedTable,
    /// Table the relationship points to.
    pub remote_table: QualifiedTable,
    /// Columns of the foreign key's owning table, in constraint order.
    pub local_columns: Vec<String>,
    /// Columns the foreign key references, in constraint order.
    pub referenced_columns: Vec<String>,
    pub is_unique: bool,
    pub constraint_name: String,
    /// Filled in by the name resolver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RelationshipCandidate {
    fn from_foreign_key(
        table: &TableSchema,
        fk: &ForeignKeyConstraint,
        kind: RelationshipKind,
        direction: Direction,
    ) -> Self {
        let remote_table = match direction {
            Direction::Outgoing => fk.ref_table(),
            Direction::Incoming => fk.table(),
        };
        Self {
            kind,
            direction,
            table: table.table.clone(),
            remote_table,
            local_columns: fk.columns(),
            referenced_columns: fk.referenced_columns(),
            is_unique: fk.is_unique,
            constraint_name: fk.constraint_name.clone(),
            name: None,
        }
    }

    pub fn is_object_relationship(&self) -> bool {
        self.kind == RelationshipKind::Object
    }

    /// A to-one relationship declared on the referenced side.
    pub fn is_reverse_object(&self) -> bool {
        self.kind == RelationshipKind::Object && self.direction == Direction::Incoming
    }

    /// Columns on the table the relationship is created on.
    pub fn table_columns(&self) -> &[String] {
        match self.direction {
            Direction::Outgoing => &self.local_columns,
            Direction::Incoming => &self.referenced_columns,
        }
    }

    /// Columns on the remote table.
    pub fn remote_columns(&self) -> &[String] {
        match self.direction {
            Direction::Outgoing => &self.referenced_columns,
            Direction::Incoming => &self.local_columns,
        }
    }

    /// Column pairs oriented this table → remote table.
    pub fn column_mapping(&self) -> Vec<(&str, &str)> {
        self.table_columns()
            .iter()
            .zip(self.remote_columns())
            .map(|(l, r)| (l.as_str(), r.as_str()))
            .collect()
    }

    /// Same kind, same remote table, same column pairs.
    pub fn same_relationship(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.table == other.table
            && self.remote_table == other.remote_table
            && self.column_mapping() == other.column_mapping()
    }
}

/// The proposals for one table, objects and arrays kept apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub objects: Vec<RelationshipCandidate>,
    pub arrays: Vec<RelationshipCandidate>,
}

impl Candidates {
    pub fn len(&self) -> usize {
        self.objects.len() + self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.arrays.is_empty()
    }

    /// Objects first, then arrays: the order names are resolved in.
    pub fn into_resolution_order(self) -> impl Iterator<Item = RelationshipCandidate> {
        self.objects.into_iter().chain(self.arrays)
    }

    fn push(&mut self, candidate: RelationshipCandidate, existing: &ExistingRelationships<'_>) {
        if existing.covers(&candidate) {
            debug!(
                table = %candidate.table,
                remote = %candidate.remote_table,
                constraint = %candidate.constraint_name,
                kind = %candidate.kind,
                "relationship already tracked"
            );
            return;
        }

        let list = match candidate.kind {
            RelationshipKind::Object => &mut self.objects,
            RelationshipKind::Array => &mut self.arrays,
        };
        if list.iter().any(|c| c.same_relationship(&candidate)) {
            debug!(
                table = %candidate.table,
                constraint = %candidate.constraint_name,
                "duplicate foreign key, relationship already proposed"
            );
            return;
        }
        list.push(candidate);
    }
}

/// Propose the untracked relationships of `table`.
///
/// `snapshot` is the full merged schema of the run; a foreign key whose
/// other end is tracked in metadata but missing from introspection is
/// skipped.
pub fn generate_candidates(table: &TableSchema, snapshot: &SchemaSnapshot) -> Candidates {
    let existing = ExistingRelationships::of(table);
    let mut candidates = Candidates::default();

    for fk in &table.foreign_keys {
        if !fk.is_ref_table_tracked || !usable(fk, &fk.ref_table(), snapshot) {
            continue;
        }
        let candidate = RelationshipCandidate::from_foreign_key(
            table,
            fk,
            RelationshipKind::Object,
            Direction::Outgoing,
        );
        candidates.push(candidate, &existing);
    }

    for fk in &table.opposite_foreign_keys {
        if !fk.is_table_tracked || !usable(fk, &fk.table(), snapshot) {
            continue;
        }
        let kind = if fk.is_unique {
            RelationshipKind::Object
        } else {
            RelationshipKind::Array
        };
        let candidate = RelationshipCandidate::from_foreign_key(table, fk, kind, Direction::Incoming);
        candidates.push(candidate, &existing);
    }

    candidates
}

fn usable(fk: &ForeignKeyConstraint, other_end: &QualifiedTable, snapshot: &SchemaSnapshot) -> bool {
    if fk.column_mapping.is_empty() {
        debug!(constraint = %fk.constraint_name, "foreign key without columns");
        return false;
    }
    if !snapshot.contains(other_end) {
        debug!(
            constraint = %fk.constraint_name,
            table = %other_end,
            "tracked table missing from introspection"
        );
        return false;
    }
    true
}
