//! Errors recovered locally during inference.
//!
//! None of these abort a run: the merger drops the unit that failed to parse
//! and the engine skips a candidate whose name could not be formed. They are
//! surfaced as values so the caller decides how loudly to log them.

use thiserror::Error;

use crate::metadata::QualifiedTable;

/// Malformed embedded JSON in the introspection result.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A table's embedded column list did not parse.
    #[error("invalid column list for {table}: {source}")]
    Columns {
        table: QualifiedTable,
        #[source]
        source: serde_json::Error,
    },

    /// The foreign-key document did not parse.
    #[error("invalid foreign key document: {0}")]
    ForeignKeys(#[source] serde_json::Error),
}

/// A relationship name could not be formed for a candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// Inflection produced nothing usable (empty remote table name).
    #[error("no name can be derived from remote table '{remote_table}'")]
    EmptyName { remote_table: String },

    /// Every numeric suffix of the fallback name is taken.
    #[error("no free suffix left for '{base}'")]
    SuffixExhausted { base: String },
}
