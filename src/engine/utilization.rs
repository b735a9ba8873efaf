//! Occupancy percentages for blocks and ranges.

use serde::Serialize;

use crate::model::{EntityId, RangeKind};
use crate::store::Tables;

/// Occupancy of a block or range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UtilizationReport {
    pub percentage: f64,
    pub used: u128,
    pub total: u128,
}

impl UtilizationReport {
    /// The fail-soft result: missing or malformed input reports as empty.
    pub fn empty() -> Self {
        UtilizationReport {
            percentage: 0.0,
            used: 0,
            total: 0,
        }
    }
}

fn percentage(used: u128, total: u128) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

/// Occupancy of a block.
///
/// `total` is the block's span, `child_sum` the summed spans of its direct
/// children (coverage is not de-duplicated; callers keep children disjoint
/// by construction), `used` the count of tracked addresses falling inside
/// the block, each counted once regardless of any mask. The reported figure
/// is `max(child_sum, used) / total`: taking the max rather than the sum
/// avoids double-counting addresses that sit inside a child block and are
/// also tracked individually, at the cost of understating occupancy when
/// sparse children and independently tracked hosts coexist.
pub fn block_utilization(tables: &Tables, id: EntityId) -> UtilizationReport {
    let block = match tables.block(id) {
        Some(b) => b,
        // Fail soft: an unknown block reports as empty rather than erroring.
        None => return UtilizationReport::empty(),
    };
    let total = block.prefix.host_capacity();

    let child_sum: u128 = tables
        .children_of(id)
        .into_iter()
        .filter_map(|cid| tables.block(cid))
        .fold(0u128, |acc, c| acc.saturating_add(c.prefix.host_capacity()));

    let used = tables
        .addresses_in_domain(block.domain.as_deref())
        .into_iter()
        .filter(|a| block.prefix.contains_ordinal(a.ordinal(), a.family()))
        .count() as u128;

    UtilizationReport {
        percentage: percentage(child_sum.max(used), total),
        used,
        total,
    }
}

/// Occupancy of a range: tracked addresses inside it over its span.
pub fn range_utilization(tables: &Tables, id: EntityId) -> UtilizationReport {
    let range = match tables.range(id) {
        Some(r) => r,
        None => return UtilizationReport::empty(),
    };
    let total = range.span();

    let used = match &range.kind {
        RangeKind::Ip { family, domain, .. } => tables
            .addresses_in_domain(domain.as_deref())
            .into_iter()
            .filter(|a| {
                a.family() == *family && a.ordinal() >= range.start && a.ordinal() <= range.end
            })
            .count() as u128,
        // ASN and VLAN ordinals have no tracked-single-value table.
        RangeKind::Asn { .. } | RangeKind::Vlan { .. } => 0,
    };

    UtilizationReport {
        percentage: percentage(used, total),
        used,
        total,
    }
}
