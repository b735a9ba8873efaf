//! Engine error taxonomy.
//!
//! Every mutation failure aborts the owning transaction atomically; the
//! conflict-carrying variants hold enough context (value plus scope) for an
//! operator to resolve the problem without re-querying the data set.

use crate::model::EntityId;

/// Errors raised by inventory mutations and lookups.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed value: unparsable CIDR, host bits set, `start > end`,
    /// out-of-bounds VLAN id, or mixed address families.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A new or updated range overlaps an existing range in the same scope.
    /// Boundary-touching ranges count as overlapping.
    #[error("Range {candidate} overlaps existing range {existing} (id {existing_id}) in scope {scope}")]
    Overlap {
        candidate: String,
        existing: String,
        existing_id: EntityId,
        scope: String,
    },

    /// A value already exists within the same scope.
    #[error("Duplicate value {value} in scope {scope}")]
    Duplicate { value: String, scope: String },

    /// An id lookup found nothing. For address matching this is an expected
    /// outcome and is modelled as `Option` instead.
    #[error("No {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntityId },
}

impl EngineError {
    /// True for the conflict class of errors (overlap or duplicate).
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Overlap { .. } | EngineError::Duplicate { .. })
    }
}
