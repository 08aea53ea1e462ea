//! Inference engine.
//!
//! Drives candidate generation, name resolution and request rendering over a
//! [`SchemaSnapshot`]. Each table is planned independently; the only state
//! carried between candidates of one table is its [`FieldOccupancy`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::candidates::generate_candidates;
use super::existing::FieldOccupancy;
use super::naming::{NameCase, NameResolver};
use super::query::{PlannedRelationship, QueryBuilder};
use super::schema::{SchemaSnapshot, TableSchema};
use crate::metadata::{DataSource, QualifiedTable};

/// Tunables of a planning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Case of fallback relationship names.
    pub name_case: NameCase,
    /// Render drop requests next to every create request.
    pub include_down_queries: bool,
}

/// The relationships to create on one table, in resolution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePlan {
    pub table: QualifiedTable,
    pub relationships: Vec<PlannedRelationship>,
}

/// All planned relationships of a run, grouped by table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InferencePlan {
    pub tables: Vec<TablePlan>,
}

impl InferencePlan {
    /// Number of planned relationships.
    pub fn len(&self) -> usize {
        self.tables.iter().map(|t| t.relationships.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(|t| t.relationships.is_empty())
    }

    pub fn table(&self, table: &QualifiedTable) -> Option<&TablePlan> {
        self.tables.iter().find(|t| &t.table == table)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &PlannedRelationship> {
        self.tables.iter().flat_map(|t| t.relationships.iter())
    }
}

/// Plans missing relationships for one data source.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    resolver: NameResolver,
    builder: QueryBuilder,
}

impl InferenceEngine {
    pub fn new(source: DataSource) -> Self {
        Self::with_config(source, InferenceConfig::default())
    }

    pub fn with_config(source: DataSource, config: InferenceConfig) -> Self {
        Self {
            resolver: NameResolver::new(config.name_case),
            builder: QueryBuilder::new(source).with_down_queries(config.include_down_queries),
        }
    }

    /// Plan every tracked table of the snapshot.
    ///
    /// Untracked tables are skipped: relationships can only be created on a
    /// tracked table. Tables with nothing to create are left out.
    pub fn plan(&self, snapshot: &SchemaSnapshot) -> InferencePlan {
        let tables: Vec<TablePlan> = snapshot
            .iter()
            .filter(|table| {
                if !table.is_table_tracked {
                    debug!(table = %table.table, "skipping untracked table");
                }
                table.is_table_tracked
            })
            .map(|table| self.plan_table(table, snapshot))
            .filter(|plan| !plan.relationships.is_empty())
            .collect();

        let plan = InferencePlan { tables };
        info!(
            tables = plan.tables.len(),
            relationships = plan.len(),
            source = %self.builder.source().name,
            "planned untracked relationships"
        );
        plan
    }

    /// Plan a single table. Object candidates are named before array
    /// candidates.
    pub fn plan_table(&self, table: &TableSchema, snapshot: &SchemaSnapshot) -> TablePlan {
        let candidates = generate_candidates(table, snapshot);
        let mut occupancy = FieldOccupancy::for_table(table);
        let mut relationships = Vec::with_capacity(candidates.len());

        for candidate in candidates.into_resolution_order() {
            match self.resolver.resolve(&candidate, &mut occupancy) {
                Ok(name) => {
                    debug!(
                        table = %table.table,
                        name = %name,
                        kind = %candidate.kind,
                        remote = %candidate.remote_table,
                        "resolved relationship"
                    );
                    relationships.push(self.builder.build(&candidate, &name));
                }
                Err(e) => {
                    warn!(
                        table = %table.table,
                        constraint = %candidate.constraint_name,
                        error = %e,
                        "skipping relationship without a usable name"
                    );
                }
            }
        }

        TablePlan {
            table: table.table.clone(),
            relationships,
        }
    }
}
