//! Closed-interval overlap validation for allocation ranges.
//!
//! One validator serves IP ranges, ASN ranges and VLAN-id ranges; the only
//! per-kind variation is how the scope key and ordinals are derived, which
//! the entities themselves provide via [`Scoped`].

use log::warn;

use crate::error::EngineError;
use crate::model::{AllocationRange, RangeKind, VLAN_MAX, VLAN_MIN};
use crate::prefix::Family;
use crate::scope::Scoped;

/// Structural validation of a single range, before any scope scan.
pub fn check_structure(range: &AllocationRange) -> Result<(), EngineError> {
    if range.start > range.end {
        return Err(EngineError::InvalidValue(format!(
            "range start {} is after end {}",
            range.endpoint_str(range.start),
            range.endpoint_str(range.end)
        )));
    }
    match &range.kind {
        RangeKind::Ip { family, .. } => {
            let max = match family {
                Family::V4 => u32::MAX as u128,
                Family::V6 => u128::MAX,
            };
            if range.end > max {
                return Err(EngineError::InvalidValue(format!(
                    "range end {} does not fit {}",
                    range.end, family
                )));
            }
        }
        RangeKind::Asn { .. } => {
            if range.end > u32::MAX as u128 {
                return Err(EngineError::InvalidValue(format!(
                    "ASN {} is above the 32-bit ASN space",
                    range.end
                )));
            }
        }
        RangeKind::Vlan { .. } => {
            if range.start < VLAN_MIN || range.end > VLAN_MAX {
                return Err(EngineError::InvalidValue(format!(
                    "VLAN ids must be within {}-{}, got {}",
                    VLAN_MIN,
                    VLAN_MAX,
                    range.display_value()
                )));
            }
        }
    }
    Ok(())
}

/// Reject `candidate` if it overlaps any same-scope range in `existing`.
///
/// Closed intervals `[a,b]` and `[c,d]` overlap iff `a <= d && c <= b`:
/// boundary-touching ranges (end of one equals start of the next) count as
/// overlapping. `existing` may contain the candidate itself (updates); rows
/// with the candidate's id are skipped.
pub fn validate<'a, I>(candidate: &AllocationRange, existing: I) -> Result<(), EngineError>
where
    I: IntoIterator<Item = &'a AllocationRange>,
{
    check_structure(candidate)?;
    let scope = candidate.scope_key();
    for other in existing {
        if other.id == candidate.id || other.scope_key() != scope {
            continue;
        }
        if candidate.start <= other.end && other.start <= candidate.end {
            warn!(
                "range {} conflicts with existing {} (id {}) in scope {}",
                candidate.display_value(),
                other.display_value(),
                other.id,
                scope
            );
            return Err(EngineError::Overlap {
                candidate: candidate.display_value(),
                existing: other.display_value(),
                existing_id: other.id,
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}
