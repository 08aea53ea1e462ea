//! Engine-facing side of the crate.
//!
//! Wire types for the engine's metadata API, the collaborator traits the
//! inference run depends on, and an HTTP client implementing them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      introspect / apply_plan                    │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │  SchemaSource              │  MetadataStore               │  │
//! │  │  - fetch_tables()          │  - fetch_tracked()           │  │
//! │  │  - fetch_foreign_keys()    │                              │  │
//! │  │                            │  MetadataSink                │  │
//! │  │                            │  - submit()                  │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      GraphqlEngineClient                        │
//! │            (/v2/query run_sql, /v1/metadata over HTTP)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reltrack::inference::InferenceEngine;
//! use reltrack::metadata::{apply_plan, introspect, DataSource, GraphqlEngineClient, SourceKind};
//!
//! let source = DataSource::new("bikes", SourceKind::Mssql);
//! let client = GraphqlEngineClient::new("http://localhost:8080", source.clone())?;
//!
//! let snapshot = introspect(&client, &client).await?;
//! let plan = InferenceEngine::new(source).plan(&snapshot);
//! let report = apply_plan(&client, &plan).await;
//! ```

mod error;
mod graphql_engine;
mod provider;
pub mod sql;
mod types;

pub use error::{MetadataError, MetadataResult};
pub use graphql_engine::{GraphqlEngineClient, DEFAULT_TIMEOUT_SECS};
pub use provider::{
    apply_plan, introspect, track_table_query, track_untracked_tables, AppliedRequest, ApplyReport,
    FailedRequest, MetadataSink, MetadataStore, SchemaSource,
};
pub use types::*;
