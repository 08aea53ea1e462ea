//! Relationship name resolution.
//!
//! Names are tried in order until one is free in the table's
//! [`FieldOccupancy`]:
//!
//! 1. the remote table name, singular for object and plural for array
//!    relationships (`customer`, `orders`);
//! 2. that name joined with the foreign-key columns
//!    (`customer_by_customer_id`), in the configured case;
//! 3. the fallback with an increasing numeric suffix
//!    (`customer_by_customer_id_1`, `_2`, ...).
//!
//! The winning name is claimed immediately so later candidates of the same
//! table cannot pick it again.

use inflector::Inflector;
use serde::{Deserialize, Serialize};

use super::candidates::{RelationshipCandidate, RelationshipKind};
use super::error::NamingError;
use super::existing::FieldOccupancy;
use super::inflection::{plural_name, singular_name};

/// Case convention of generated fallback names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameCase {
    /// `customer_by_customer_id`, suffixed `customer_by_customer_id_1`.
    #[default]
    Snake,
    /// `customerByCustomerId`, suffixed `customerByCustomerId1`.
    Camel,
}

impl std::str::FromStr for NameCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snake" | "snake_case" => Ok(Self::Snake),
            "camel" | "camelcase" => Ok(Self::Camel),
            other => Err(format!("unknown name case: {}", other)),
        }
    }
}

/// Produces unique relationship names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver {
    case: NameCase,
}

impl NameResolver {
    pub fn new(case: NameCase) -> Self {
        Self { case }
    }

    /// Pick a free name for `candidate` and claim it in `occupancy`.
    pub fn resolve(
        &self,
        candidate: &RelationshipCandidate,
        occupancy: &mut FieldOccupancy,
    ) -> Result<String, NamingError> {
        let primary = self.primary_name(candidate);
        if primary.is_empty() {
            return Err(NamingError::EmptyName {
                remote_table: candidate.remote_table.to_string(),
            });
        }
        if occupancy.claim(primary.as_str()) {
            return Ok(primary);
        }

        let fallback = self.fallback_name(candidate);
        if occupancy.claim(fallback.as_str()) {
            return Ok(fallback);
        }

        for n in 1..=u32::MAX {
            let suffixed = self.with_suffix(&fallback, n);
            if occupancy.claim(suffixed.as_str()) {
                return Ok(suffixed);
            }
        }
        Err(NamingError::SuffixExhausted { base: fallback })
    }

    /// Singular remote table name for objects, plural for arrays.
    pub fn primary_name(&self, candidate: &RelationshipCandidate) -> String {
        match candidate.kind {
            RelationshipKind::Object => singular_name(&candidate.remote_table.name),
            RelationshipKind::Array => plural_name(&candidate.remote_table.name),
        }
    }

    /// Primary name qualified by the constraint's columns: the owning
    /// table's columns for objects, the referenced columns for arrays.
    pub fn fallback_name(&self, candidate: &RelationshipCandidate) -> String {
        let columns = match candidate.kind {
            RelationshipKind::Object => &candidate.local_columns,
            RelationshipKind::Array => &candidate.referenced_columns,
        };
        let composite = format!("{}_by_{}", self.primary_name(candidate), columns.join("_"));
        match self.case {
            NameCase::Snake => composite,
            NameCase::Camel => composite.to_camel_case(),
        }
    }

    fn with_suffix(&self, base: &str, n: u32) -> String {
        match self.case {
            NameCase::Snake => format!("{}_{}", base, n),
            NameCase::Camel => format!("{}{}", base, n),
        }
    }
}
