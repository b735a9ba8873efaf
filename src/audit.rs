//! Offline consistency audit over the whole inventory.
//!
//! Verifies the invariants the engine maintains transactionally:
//! `child_count` against live children, `depth` against the parent chain,
//! `parent_id` against containment, pairwise range overlap, and address
//! uniqueness. Scope buckets are independent, so the sweep runs them in
//! parallel. Intended for drift detection on pre-existing data, not as a
//! runtime fallback.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::engine::hierarchy;
use crate::scope::{ScopeKey, Scoped};
use crate::store::Tables;

/// One detected inconsistency.
#[derive(Debug, Clone, Serialize)]
pub struct AuditFinding {
    pub entity: String,
    pub problem: String,
}

/// Sweep every scope bucket and report all findings, deterministically
/// ordered.
pub fn audit_tables(tables: &Tables) -> Vec<AuditFinding> {
    let block_scopes: HashSet<ScopeKey> = tables.blocks().map(|b| b.scope_key()).collect();
    let range_scopes: HashSet<ScopeKey> = tables.ranges().map(|r| r.scope_key()).collect();

    let mut findings: Vec<AuditFinding> = block_scopes
        .par_iter()
        .flat_map(|scope| audit_block_scope(tables, scope))
        .chain(
            range_scopes
                .par_iter()
                .flat_map(|scope| audit_range_scope(tables, scope)),
        )
        .collect();
    findings.extend(audit_addresses(tables));
    findings.sort_by(|a, b| a.entity.cmp(&b.entity).then(a.problem.cmp(&b.problem)));
    findings
}

fn audit_block_scope(tables: &Tables, scope: &ScopeKey) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    let blocks = tables.blocks_in_scope(scope);

    let mut seen = HashSet::new();
    for block in &blocks {
        let entity = format!("block {} (id {})", block.prefix, block.id);

        if !seen.insert(block.prefix) {
            findings.push(AuditFinding {
                entity: entity.clone(),
                problem: format!("duplicate value in scope {}", scope),
            });
        }

        let live_children = tables.children_of(block.id).len() as u64;
        if block.child_count != live_children {
            findings.push(AuditFinding {
                entity: entity.clone(),
                problem: format!(
                    "child_count {} disagrees with live children {}",
                    block.child_count, live_children
                ),
            });
        }

        let expected_parent = hierarchy::locate_parent(tables, block.id);
        if block.parent_id != expected_parent {
            findings.push(AuditFinding {
                entity: entity.clone(),
                problem: format!(
                    "parent_id {:?} disagrees with containment ({:?})",
                    block.parent_id, expected_parent
                ),
            });
        }

        let expected_depth = match block.parent_id.and_then(|pid| tables.block(pid)) {
            Some(parent) => parent.depth + 1,
            None => 0,
        };
        if block.depth != expected_depth {
            findings.push(AuditFinding {
                entity,
                problem: format!("depth {} should be {}", block.depth, expected_depth),
            });
        }
    }
    findings
}

fn audit_range_scope(tables: &Tables, scope: &ScopeKey) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    let ranges = tables.ranges_in_scope(scope);
    // Rows are ordered by start, so only the neighbor can overlap first.
    for pair in ranges.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.start <= b.end && b.start <= a.end {
            findings.push(AuditFinding {
                entity: format!("range {} (id {})", b.display_value(), b.id),
                problem: format!(
                    "overlaps range {} (id {}) in scope {}",
                    a.display_value(),
                    a.id,
                    scope
                ),
            });
        }
    }
    findings
}

fn audit_addresses(tables: &Tables) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    let mut seen: HashMap<(ScopeKey, u128), u64> = HashMap::new();
    let mut addresses: Vec<_> = tables.addresses().collect();
    addresses.sort_by_key(|a| a.id);
    for addr in addresses {
        let key = (addr.scope_key(), addr.ordinal());
        if let Some(first) = seen.get(&key) {
            findings.push(AuditFinding {
                entity: format!("address {} (id {})", addr.addr, addr.id),
                problem: format!("duplicate of id {} in scope {}", first, key.0),
            });
        } else {
            seen.insert(key, addr.id);
        }
    }
    findings
}
