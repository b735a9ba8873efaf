//! The bookkeeping engine.
//!
//! Mutation entry points run validation, uniqueness, hierarchy and overlap
//! maintenance inside one store transaction: a block is never persisted with
//! a half-updated hierarchy, and a failed mutation leaves no trace. Read
//! queries (longest-prefix match, utilization, free-address enumeration) run
//! against a consistent snapshot.

pub mod available;
pub mod hierarchy;
pub mod matcher;
pub mod overlap;
pub mod utilization;

pub use matcher::CoveringBlock;
pub use utilization::UtilizationReport;

use std::collections::BTreeSet;
use std::net::IpAddr;

use chrono::Utc;
use log::info;

use crate::error::EngineError;
use crate::model::{AllocationRange, BlockStatus, EntityId, RangeKind};
use crate::prefix::{addr_ordinal, Prefix};
use crate::scope::{ScopeKey, Scoped};
use crate::store::{MemoryStore, Store, Tables};

/// Facade over the inventory store.
pub struct InventoryEngine<S: Store = MemoryStore> {
    store: S,
}

impl InventoryEngine<MemoryStore> {
    /// Engine over a fresh in-memory store.
    pub fn in_memory() -> Self {
        InventoryEngine::new(MemoryStore::new())
    }
}

impl<S: Store> InventoryEngine<S> {
    pub fn new(store: S) -> Self {
        InventoryEngine { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- block mutations ---

    /// Create a block and slot it into the containment hierarchy.
    pub fn create_block(
        &self,
        prefix: Prefix,
        domain: Option<String>,
        status: BlockStatus,
    ) -> Result<EntityId, EngineError> {
        let id = self.store.transact(|t| {
            let scope = ScopeKey::Block {
                domain: domain.clone(),
            };
            if t.block_by_value(&prefix, &scope).is_some() {
                return Err(EngineError::Duplicate {
                    value: prefix.to_string(),
                    scope: scope.to_string(),
                });
            }
            let id = t.insert_block(prefix, domain.clone(), status);
            hierarchy::attach(t, id);
            hierarchy::adopt_contained(t, id);
            Ok(id)
        })?;
        info!("created block {} (id {})", prefix, id);
        Ok(id)
    }

    /// Replace a block's value, scope and status. The address family is
    /// immutable; the hierarchy of both the old and new neighborhoods is
    /// repaired in the same transaction.
    pub fn update_block(
        &self,
        id: EntityId,
        prefix: Prefix,
        domain: Option<String>,
        status: BlockStatus,
    ) -> Result<(), EngineError> {
        self.store.transact(|t| {
            let old = t
                .block(id)
                .cloned()
                .ok_or(EngineError::NotFound { entity: "block", id })?;
            if prefix.family() != old.prefix.family() {
                return Err(EngineError::InvalidValue(format!(
                    "address family of block {} is immutable ({} -> {})",
                    id,
                    old.prefix.family(),
                    prefix.family()
                )));
            }
            let scope = ScopeKey::Block {
                domain: domain.clone(),
            };
            if let Some(existing) = t.block_by_value(&prefix, &scope) {
                if existing.id != id {
                    return Err(EngineError::Duplicate {
                        value: prefix.to_string(),
                        scope: scope.to_string(),
                    });
                }
            }

            let former_children = t.children_of(id);
            if let Some(b) = t.block_mut(id) {
                b.prefix = prefix;
                b.domain = domain.clone();
                b.status = status;
                b.updated_at = Utc::now();
            }
            hierarchy::attach(t, id);
            for child in former_children {
                hierarchy::attach(t, child);
            }
            hierarchy::adopt_contained(t, id);
            Ok(())
        })?;
        info!("updated block id {} to {}", id, prefix);
        Ok(())
    }

    /// Delete a block. Its children are re-parented by containment within
    /// the same transaction: they land on the deleted block's former parent
    /// when it still contains them, otherwise they become roots. Counters on
    /// the former parent are kept correct either way.
    pub fn delete_block(&self, id: EntityId) -> Result<(), EngineError> {
        self.store.transact(|t| {
            if t.block(id).is_none() {
                return Err(EngineError::NotFound { entity: "block", id });
            }
            let orphans = t.children_of(id);
            hierarchy::detach(t, id);
            for &orphan in &orphans {
                // The parent row is going away; clear the link without
                // touching its counter, then re-derive below.
                if let Some(b) = t.block_mut(orphan) {
                    b.parent_id = None;
                    b.depth = 0;
                }
                hierarchy::recompute_subtree_depths(t, orphan);
            }
            t.remove_block(id);
            for orphan in orphans {
                hierarchy::attach(t, orphan);
            }
            Ok(())
        })?;
        info!("deleted block id {}", id);
        Ok(())
    }

    // --- range mutations ---

    /// Create an allocation range after the structural and overlap checks.
    pub fn create_range(
        &self,
        kind: RangeKind,
        start: u128,
        end: u128,
    ) -> Result<EntityId, EngineError> {
        let id = self.store.transact(|t| {
            let now = Utc::now();
            let candidate = AllocationRange {
                id: 0,
                kind: kind.clone(),
                start,
                end,
                created_at: now,
                updated_at: now,
            };
            overlap::validate(&candidate, t.ranges_in_scope(&candidate.scope_key()))?;
            Ok(t.insert_range(kind.clone(), start, end))
        })?;
        info!("created range id {}", id);
        Ok(id)
    }

    /// Move a range's endpoints, re-running the overlap scan against every
    /// other range in scope.
    pub fn update_range(&self, id: EntityId, start: u128, end: u128) -> Result<(), EngineError> {
        self.store.transact(|t| {
            let mut candidate = t
                .range(id)
                .cloned()
                .ok_or(EngineError::NotFound { entity: "range", id })?;
            candidate.start = start;
            candidate.end = end;
            overlap::validate(&candidate, t.ranges_in_scope(&candidate.scope_key()))?;
            if let Some(r) = t.range_mut(id) {
                r.start = start;
                r.end = end;
                r.updated_at = Utc::now();
            }
            Ok(())
        })?;
        info!("updated range id {}", id);
        Ok(())
    }

    pub fn delete_range(&self, id: EntityId) -> Result<(), EngineError> {
        self.store.transact(|t| {
            t.remove_range(id)
                .map(|_| ())
                .ok_or(EngineError::NotFound { entity: "range", id })
        })?;
        info!("deleted range id {}", id);
        Ok(())
    }

    // --- address mutations ---

    /// Track a single address, unique per (value, scope).
    pub fn create_address(
        &self,
        addr: IpAddr,
        domain: Option<String>,
        tenant: Option<String>,
    ) -> Result<EntityId, EngineError> {
        let id = self.store.transact(|t| {
            let scope = ScopeKey::Address {
                domain: domain.clone(),
                tenant: tenant.clone(),
            };
            if t.addresses_in_scope(&scope).iter().any(|a| a.addr == addr) {
                return Err(EngineError::Duplicate {
                    value: addr.to_string(),
                    scope: scope.to_string(),
                });
            }
            Ok(t.insert_address(addr, domain.clone(), tenant.clone()))
        })?;
        info!("tracked address {} (id {})", addr, id);
        Ok(id)
    }

    pub fn delete_address(&self, id: EntityId) -> Result<(), EngineError> {
        self.store.transact(|t| {
            t.remove_address(id)
                .map(|_| ())
                .ok_or(EngineError::NotFound {
                    entity: "address",
                    id,
                })
        })?;
        info!("untracked address id {}", id);
        Ok(())
    }

    // --- reads ---

    /// Most specific covering block for an address, or `None` when no block
    /// covers it yet.
    pub fn match_address(&self, addr: &IpAddr, domain: Option<&str>) -> Option<CoveringBlock> {
        self.store
            .read(|t| matcher::match_address(t, addr, domain))
    }

    /// Occupancy of a block; unknown ids report as empty (fail soft).
    pub fn block_utilization(&self, id: EntityId) -> UtilizationReport {
        self.store.read(|t| utilization::block_utilization(t, id))
    }

    /// Occupancy of a range; unknown ids report as empty (fail soft).
    pub fn range_utilization(&self, id: EntityId) -> UtilizationReport {
        self.store.read(|t| utilization::range_utilization(t, id))
    }

    /// Free addresses of a block, ascending, bounded by `limit`.
    pub fn available_addresses(
        &self,
        block_id: EntityId,
        limit: Option<usize>,
    ) -> Result<Vec<IpAddr>, EngineError> {
        self.store.read(|t| {
            let block = t.block(block_id).ok_or(EngineError::NotFound {
                entity: "block",
                id: block_id,
            })?;
            let used = used_ordinals(t, block.domain.as_deref());
            Ok(available::available_addresses(block, &used, limit))
        })
    }

    /// Free addresses of an IP range, ascending, bounded by `limit`.
    pub fn available_in_range(
        &self,
        range_id: EntityId,
        limit: Option<usize>,
    ) -> Result<Vec<IpAddr>, EngineError> {
        self.store.read(|t| {
            let range = t.range(range_id).ok_or(EngineError::NotFound {
                entity: "range",
                id: range_id,
            })?;
            match &range.kind {
                RangeKind::Ip { family, domain, .. } => {
                    let used = used_ordinals(t, domain.as_deref());
                    Ok(available::available_in_span(
                        range.start,
                        range.end,
                        *family,
                        &used,
                        limit,
                    ))
                }
                other => Err(EngineError::InvalidValue(format!(
                    "range id {} is a {} range, not an IP range",
                    range_id,
                    other.label()
                ))),
            }
        })
    }

    /// Lowest free address of a block, or `None` when exhausted.
    pub fn first_available(&self, block_id: EntityId) -> Result<Option<IpAddr>, EngineError> {
        Ok(self
            .available_addresses(block_id, Some(1))?
            .into_iter()
            .next())
    }

    /// Look a block up by value and routing domain.
    pub fn find_block(&self, prefix: &Prefix, domain: Option<&str>) -> Option<EntityId> {
        let scope = ScopeKey::Block {
            domain: domain.map(|d| d.to_string()),
        };
        self.store
            .read(|t| t.block_by_value(prefix, &scope).map(|b| b.id))
    }
}

/// Ordinals of every tracked address in a routing-domain bucket.
fn used_ordinals(tables: &Tables, domain: Option<&str>) -> BTreeSet<u128> {
    tables
        .addresses_in_domain(domain)
        .into_iter()
        .map(|a| addr_ordinal(&a.addr))
        .collect()
}
