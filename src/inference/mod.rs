//! Relationship inference and naming.
//!
//! # Architecture
//!
//! ```text
//! raw table rows ─┐
//! raw FK JSON ────┼─► merge ─► SchemaSnapshot
//! tracked meta ───┘                 │
//!                                   ▼   (per table)
//!                    generate_candidates ─► NameResolver ─► QueryBuilder
//!                     (ExistingRelationships)  (FieldOccupancy)
//!                                   │
//!                                   ▼
//!                             InferencePlan
//! ```
//!
//! Everything here is synchronous and free of I/O. Tables are planned
//! independently; within a table, names are resolved one candidate at a
//! time because each resolution narrows the free names for the next.
//!
//! # Example
//!
//! ```ignore
//! use reltrack::inference::{merge, InferenceEngine};
//! use reltrack::metadata::{DataSource, SourceKind};
//!
//! let snapshot = merge(&table_rows, &foreign_keys, &tracked);
//! let engine = InferenceEngine::new(DataSource::new("default", SourceKind::Mssql));
//! for planned in engine.plan(&snapshot).relationships() {
//!     println!("{}", serde_json::to_string(&planned.up)?);
//! }
//! ```

mod candidates;
mod engine;
mod error;
mod existing;
pub mod inflection;
mod merge;
mod naming;
mod query;
mod schema;

pub use candidates::{generate_candidates, Candidates, Direction, RelationshipCandidate, RelationshipKind};
pub use engine::{InferenceConfig, InferenceEngine, InferencePlan, TablePlan};
pub use error::{NamingError, ParseError};
pub use existing::{ExistingRelationships, FieldOccupancy};
pub use merge::{merge, merge_parsed, parse_columns, parse_foreign_keys};
pub use naming::{NameCase, NameResolver};
pub use query::{relationship_using, PlannedRelationship, QueryBuilder};
pub use schema::{Column, ColumnPair, ForeignKeyConstraint, SchemaSnapshot, TablePermissions, TableSchema};
