//! Existing-relationship index and field occupancy.
//!
//! Both views are table-local: a candidate is only compared against the
//! relationships declared on the table it would be created on, and names
//! only need to be unique within that table's fields.

use std::collections::{BTreeSet, HashSet};

use super::candidates::{RelationshipCandidate, RelationshipKind};
use super::schema::TableSchema;
use crate::metadata::{RelationshipUsing, TrackedRelationship};

/// The object and array relationships already registered on one table.
#[derive(Debug, Clone, Copy)]
pub struct ExistingRelationships<'a> {
    objects: &'a [TrackedRelationship],
    arrays: &'a [TrackedRelationship],
}

impl<'a> ExistingRelationships<'a> {
    pub fn new(objects: &'a [TrackedRelationship], arrays: &'a [TrackedRelationship]) -> Self {
        Self { objects, arrays }
    }

    pub fn of(table: &'a TableSchema) -> Self {
        Self::new(&table.object_relationships, &table.array_relationships)
    }

    /// Whether an existing relationship already has the candidate's semantics.
    pub fn covers(&self, candidate: &RelationshipCandidate) -> bool {
        match candidate.kind {
            RelationshipKind::Object => self.matching_object(candidate).is_some(),
            RelationshipKind::Array => self.matching_array(candidate).is_some(),
        }
    }

    /// An object relationship over the same column set.
    ///
    /// A shorthand naming this table's column(s) is compared with the
    /// candidate's columns on this table; a shorthand naming a remote table
    /// is compared on the remote side. Manual mappings compare their remote
    /// table and keys. A column shorthand never stands for a reverse object,
    /// whose columns on this table are the referenced key.
    pub fn matching_object(&self, candidate: &RelationshipCandidate) -> Option<&'a TrackedRelationship> {
        let own = column_set(candidate.table_columns().iter().map(String::as_str));
        let remote = column_set(candidate.remote_columns().iter().map(String::as_str));

        self.objects.iter().find(|rel| match &rel.using {
            RelationshipUsing::ForeignKeyConstraintOn(on) => match on.table() {
                Some(table) => {
                    table.name == candidate.remote_table.name && column_set(on.columns()) == remote
                }
                None => !candidate.is_reverse_object() && column_set(on.columns()) == own,
            },
            RelationshipUsing::ManualConfiguration(manual) => {
                manual.remote_table.name == candidate.remote_table.name
                    && column_set(manual.column_mapping.keys().map(String::as_str)) == own
            }
        })
    }

    /// An array relationship into the same remote table over the same
    /// remote column set.
    pub fn matching_array(&self, candidate: &RelationshipCandidate) -> Option<&'a TrackedRelationship> {
        let remote = column_set(candidate.remote_columns().iter().map(String::as_str));

        self.arrays.iter().find(|rel| match &rel.using {
            RelationshipUsing::ForeignKeyConstraintOn(on) => on
                .table()
                .is_some_and(|t| t.name == candidate.remote_table.name)
                && column_set(on.columns()) == remote,
            RelationshipUsing::ManualConfiguration(manual) => {
                manual.remote_table.name == candidate.remote_table.name
                    && column_set(manual.column_mapping.values().map(String::as_str)) == remote
            }
        })
    }
}

fn column_set<'s>(columns: impl IntoIterator<Item = &'s str>) -> BTreeSet<&'s str> {
    columns.into_iter().collect()
}

/// Identifiers already used as fields of one table: its columns, its
/// existing relationship names and every name resolved so far in this run.
#[derive(Debug, Clone, Default)]
pub struct FieldOccupancy {
    taken: HashSet<String>,
}

impl FieldOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_table(table: &TableSchema) -> Self {
        let taken = table
            .columns
            .iter()
            .map(|c| c.name.clone())
            .chain(table.object_relationships.iter().map(|r| r.name.clone()))
            .chain(table.array_relationships.iter().map(|r| r.name.clone()))
            .collect();
        Self { taken }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Mark a name as used. Returns false if it already was.
    pub fn claim(&mut self, name: impl Into<String>) -> bool {
        self.taken.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldOccupancy {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            taken: iter.into_iter().map(Into::into).collect(),
        }
    }
}
