//! Metadata request rendering.
//!
//! A named candidate becomes a `<prefix>_create_object_relationship` or
//! `<prefix>_create_array_relationship` request. Single-column foreign keys
//! use the `foreign_key_constraint_on` shorthand; composite keys and
//! reverse one-to-one relationships spell out a `manual_configuration`.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use super::candidates::{RelationshipCandidate, RelationshipKind};
use crate::metadata::{
    DataSource, ForeignKeyOn, ForeignKeyOnSpec, ManualConfiguration, MetadataQuery,
    RelationshipUsing,
};

/// A relationship ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRelationship {
    /// Creates the relationship.
    pub up: MetadataQuery,
    /// Removes it again, when down requests are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down: Option<MetadataQuery>,
    /// The candidate, with its resolved name.
    pub candidate: RelationshipCandidate,
}

impl PlannedRelationship {
    pub fn name(&self) -> &str {
        self.candidate.name.as_deref().unwrap_or_default()
    }
}

/// Renders candidates into metadata requests for one data source.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    source: DataSource,
    include_down: bool,
}

impl QueryBuilder {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            include_down: false,
        }
    }

    /// Also render a `<prefix>_drop_relationship` down request.
    pub fn with_down_queries(mut self, include: bool) -> Self {
        self.include_down = include;
        self
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Render `candidate` under `name`.
    pub fn build(&self, candidate: &RelationshipCandidate, name: &str) -> PlannedRelationship {
        let operation = match candidate.kind {
            RelationshipKind::Object => "create_object_relationship",
            RelationshipKind::Array => "create_array_relationship",
        };
        let up = MetadataQuery::new(
            self.source.request_type(operation),
            json!({
                "name": name,
                "source": self.source.name,
                "table": candidate.table,
                "using": relationship_using(candidate),
            }),
        );

        let down = self.include_down.then(|| {
            MetadataQuery::new(
                self.source.request_type("drop_relationship"),
                json!({
                    "relationship": name,
                    "source": self.source.name,
                    "table": candidate.table,
                }),
            )
        });

        let mut candidate = candidate.clone();
        candidate.name = Some(name.to_string());
        PlannedRelationship { up, down, candidate }
    }
}

/// The `using` clause for a candidate.
pub fn relationship_using(candidate: &RelationshipCandidate) -> RelationshipUsing {
    let single = candidate.local_columns.len() == 1;
    match candidate.kind {
        RelationshipKind::Object if single && !candidate.is_reverse_object() => {
            RelationshipUsing::ForeignKeyConstraintOn(ForeignKeyOn::Column(
                candidate.local_columns[0].clone(),
            ))
        }
        RelationshipKind::Array if single => {
            RelationshipUsing::ForeignKeyConstraintOn(ForeignKeyOn::Spec(ForeignKeyOnSpec {
                column: Some(candidate.remote_columns()[0].clone()),
                columns: Vec::new(),
                table: Some(candidate.remote_table.clone()),
            }))
        }
        _ => RelationshipUsing::ManualConfiguration(ManualConfiguration {
            column_mapping: candidate
                .column_mapping()
                .into_iter()
                .map(|(l, r)| (l.to_string(), r.to_string()))
                .collect::<BTreeMap<_, _>>(),
            remote_table: candidate.remote_table.clone(),
        }),
    }
}
