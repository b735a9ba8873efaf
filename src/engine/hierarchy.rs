//! Containment hierarchy maintenance for network blocks.
//!
//! Keeps `parent_id`, `depth` and `child_count` consistent with actual
//! containment among blocks sharing a scope. Every function here runs inside
//! the transaction of the mutation that triggered it; on any error the whole
//! mutation rolls back.
//!
//! # Invariants
//!
//! - `depth == 0` iff `parent_id` is absent
//! - `child_count == |{Q : Q.parent_id == id}|` between transactions
//! - containment is never evaluated across address families
//! - the global (no routing domain) bucket is its own scope, not a wildcard

use std::collections::VecDeque;

use log::debug;

use crate::model::EntityId;
use crate::scope::Scoped;
use crate::store::Tables;

/// Find the most specific block strictly containing `id` within its scope.
///
/// Candidates are all other blocks in the same scope and family; survivors
/// are those that strictly contain the block (proper superset, not equal).
/// Among survivors the longest mask wins. Two distinct same-mask blocks
/// cannot both strictly contain the same block, so the winner is unique when
/// present; drift-damaged data is still resolved deterministically by the
/// stable (value, id) ordering of the scope query.
pub fn locate_parent(tables: &Tables, id: EntityId) -> Option<EntityId> {
    let block = tables.block(id)?;
    let scope = block.scope_key();
    tables
        .blocks_in_scope(&scope)
        .into_iter()
        .filter(|c| c.id != id && c.family() == block.family())
        .filter(|c| c.prefix.strictly_contains(&block.prefix))
        .max_by(|a, b| {
            a.prefix
                .mask_len()
                .cmp(&b.prefix.mask_len())
                // On drift ties prefer the smaller value, then the older row.
                .then(b.prefix.first_ordinal().cmp(&a.prefix.first_ordinal()))
                .then(b.id.cmp(&a.id))
        })
        .map(|c| c.id)
}

/// Recompute the parent link of `id` and maintain both parents' counters.
///
/// Re-attaching to an unchanged parent is a no-op. Otherwise the old
/// parent's `child_count` is decremented (floored at 0), the new parent's is
/// incremented, `depth` becomes `new_parent.depth + 1` (or 0 for roots), and
/// the depths of the moved subtree are recomputed.
///
/// Returns true when the parent link changed.
pub fn attach(tables: &mut Tables, id: EntityId) -> bool {
    let old_parent = match tables.block(id) {
        Some(b) => b.parent_id,
        None => return false,
    };
    let new_parent = locate_parent(tables, id);
    if new_parent == old_parent {
        return false;
    }

    if let Some(pid) = old_parent {
        if let Some(p) = tables.block_mut(pid) {
            p.child_count = p.child_count.saturating_sub(1);
        }
    }
    let depth = match new_parent {
        Some(pid) => {
            let parent_depth = tables.block(pid).map(|p| p.depth).unwrap_or(0);
            if let Some(p) = tables.block_mut(pid) {
                p.child_count += 1;
            }
            parent_depth + 1
        }
        None => 0,
    };
    if let Some(b) = tables.block_mut(id) {
        b.parent_id = new_parent;
        b.depth = depth;
    }
    debug!(
        "re-attached block id {}: parent {:?} -> {:?}, depth {}",
        id, old_parent, new_parent, depth
    );
    recompute_subtree_depths(tables, id);
    true
}

/// Detach `id` ahead of its deletion: decrement the former parent's counter
/// and clear the link. The caller deletes the row afterwards.
pub fn detach(tables: &mut Tables, id: EntityId) {
    let parent = match tables.block(id) {
        Some(b) => b.parent_id,
        None => return,
    };
    if let Some(pid) = parent {
        if let Some(p) = tables.block_mut(pid) {
            p.child_count = p.child_count.saturating_sub(1);
        }
    }
    if let Some(b) = tables.block_mut(id) {
        b.parent_id = None;
        b.depth = 0;
    }
}

/// After inserting or re-valuing `id`, pull in the blocks it now encloses.
///
/// Without this step the hierarchy would depend on insertion order: inserting
/// a /16 after its /24s must make the /24s its children, exactly as if the
/// /16 had been there first.
pub fn adopt_contained(tables: &mut Tables, id: EntityId) {
    let (scope, family, prefix) = match tables.block(id) {
        Some(b) => (b.scope_key(), b.family(), b.prefix),
        None => return,
    };
    let candidates: Vec<EntityId> = tables
        .blocks_in_scope(&scope)
        .into_iter()
        .filter(|c| c.id != id && c.family() == family)
        .filter(|c| prefix.strictly_contains(&c.prefix))
        .map(|c| c.id)
        .collect();
    for candidate in candidates {
        attach(tables, candidate);
    }
}

/// Re-derive `depth` for every descendant of `id` by breadth-first walk over
/// the `parent_id` back-references. Needed whenever a block moves in the
/// tree, because the whole subtree shifts with it.
pub fn recompute_subtree_depths(tables: &mut Tables, id: EntityId) {
    let mut queue: VecDeque<EntityId> = VecDeque::new();
    queue.push_back(id);
    while let Some(current) = queue.pop_front() {
        let depth = match tables.block(current) {
            Some(b) => b.depth,
            None => continue,
        };
        for child_id in tables.children_of(current) {
            if let Some(child) = tables.block_mut(child_id) {
                child.depth = depth + 1;
            }
            queue.push_back(child_id);
        }
    }
}
