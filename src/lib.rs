//! # reltrack
//!
//! Infers the relationships a GraphQL engine is missing from the foreign
//! keys of a data source, names them, and renders the metadata requests that
//! create them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        GraphQL engine (run_sql, export_metadata)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [metadata::introspect]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   SchemaSnapshot                         │
//! │        (tables, columns, FKs, tracking state)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [inference::InferenceEngine]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   InferencePlan                          │
//! │        (named relationships, up/down requests)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [metadata::apply_plan]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 /v1/metadata requests                    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod inference;
pub mod metadata;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::{Settings, SettingsError};
    pub use crate::inference::{
        merge, InferenceConfig, InferenceEngine, InferencePlan, NameCase, PlannedRelationship,
        SchemaSnapshot,
    };
    pub use crate::metadata::{
        apply_plan, introspect, track_untracked_tables, ApplyReport, DataSource,
        GraphqlEngineClient, MetadataError, MetadataQuery, MetadataSink, MetadataStore,
        QualifiedTable, SchemaSource, SourceKind,
    };
}
