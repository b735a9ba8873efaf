//! In-memory inventory tables.
//!
//! Blocks form an arena indexed by id; the hierarchy is a `parent_id`
//! back-reference and children are discovered by indexed lookup on it, never
//! by embedded child pointers. All scope-level queries return entities in a
//! stable order (value ascending, then mask, then id) so that downstream
//! tie-breaks are deterministic.

use std::collections::HashMap;

use chrono::Utc;
use log::debug;

use crate::model::{AllocationRange, EntityId, NetworkBlock, RangeKind, SingleAddress};
use crate::prefix::Prefix;
use crate::scope::{ScopeKey, Scoped};

/// The three inventory tables plus the id sequence.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    blocks: HashMap<EntityId, NetworkBlock>,
    ranges: HashMap<EntityId, AllocationRange>,
    addresses: HashMap<EntityId, SingleAddress>,
    next_id: EntityId,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    // --- blocks ---

    /// Insert a new block row with zeroed hierarchy columns. The hierarchy
    /// manager fills them in within the same transaction.
    pub fn insert_block(
        &mut self,
        prefix: Prefix,
        domain: Option<String>,
        status: crate::model::BlockStatus,
    ) -> EntityId {
        let id = self.allocate_id();
        let now = Utc::now();
        self.blocks.insert(
            id,
            NetworkBlock {
                id,
                prefix,
                domain,
                parent_id: None,
                depth: 0,
                child_count: 0,
                status,
                created_at: now,
                updated_at: now,
            },
        );
        debug!("inserted block {} (id {})", self.blocks[&id].prefix, id);
        id
    }

    pub fn block(&self, id: EntityId) -> Option<&NetworkBlock> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: EntityId) -> Option<&mut NetworkBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn remove_block(&mut self, id: EntityId) -> Option<NetworkBlock> {
        self.blocks.remove(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &NetworkBlock> {
        self.blocks.values()
    }

    /// All blocks in a scope, in stable order.
    pub fn blocks_in_scope(&self, scope: &ScopeKey) -> Vec<&NetworkBlock> {
        let mut out: Vec<&NetworkBlock> = self
            .blocks
            .values()
            .filter(|b| &b.scope_key() == scope)
            .collect();
        out.sort_by_key(|b| (b.prefix.first_ordinal(), b.prefix.mask_len(), b.id));
        out
    }

    /// Ids of the blocks whose parent is `id`, in stable order.
    pub fn children_of(&self, id: EntityId) -> Vec<EntityId> {
        let mut out: Vec<&NetworkBlock> = self
            .blocks
            .values()
            .filter(|b| b.parent_id == Some(id))
            .collect();
        out.sort_by_key(|b| (b.prefix.first_ordinal(), b.prefix.mask_len(), b.id));
        out.into_iter().map(|b| b.id).collect()
    }

    /// Look a block up by its canonical value and scope.
    pub fn block_by_value(&self, prefix: &Prefix, scope: &ScopeKey) -> Option<&NetworkBlock> {
        self.blocks
            .values()
            .find(|b| &b.prefix == prefix && &b.scope_key() == scope)
    }

    // --- ranges ---

    pub fn insert_range(&mut self, kind: RangeKind, start: u128, end: u128) -> EntityId {
        let id = self.allocate_id();
        let now = Utc::now();
        self.ranges.insert(
            id,
            AllocationRange {
                id,
                kind,
                start,
                end,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn range(&self, id: EntityId) -> Option<&AllocationRange> {
        self.ranges.get(&id)
    }

    pub fn range_mut(&mut self, id: EntityId) -> Option<&mut AllocationRange> {
        self.ranges.get_mut(&id)
    }

    pub fn remove_range(&mut self, id: EntityId) -> Option<AllocationRange> {
        self.ranges.remove(&id)
    }

    pub fn ranges(&self) -> impl Iterator<Item = &AllocationRange> {
        self.ranges.values()
    }

    /// All ranges in a scope, ordered by (start, end, id).
    pub fn ranges_in_scope(&self, scope: &ScopeKey) -> Vec<&AllocationRange> {
        let mut out: Vec<&AllocationRange> = self
            .ranges
            .values()
            .filter(|r| &r.scope_key() == scope)
            .collect();
        out.sort_by_key(|r| (r.start, r.end, r.id));
        out
    }

    // --- addresses ---

    pub fn insert_address(
        &mut self,
        addr: std::net::IpAddr,
        domain: Option<String>,
        tenant: Option<String>,
    ) -> EntityId {
        let id = self.allocate_id();
        let now = Utc::now();
        self.addresses.insert(
            id,
            SingleAddress {
                id,
                addr,
                domain,
                tenant,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn address(&self, id: EntityId) -> Option<&SingleAddress> {
        self.addresses.get(&id)
    }

    pub fn remove_address(&mut self, id: EntityId) -> Option<SingleAddress> {
        self.addresses.remove(&id)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &SingleAddress> {
        self.addresses.values()
    }

    /// All tracked addresses in a scope, ordered by (ordinal, id).
    pub fn addresses_in_scope(&self, scope: &ScopeKey) -> Vec<&SingleAddress> {
        let mut out: Vec<&SingleAddress> = self
            .addresses
            .values()
            .filter(|a| &a.scope_key() == scope)
            .collect();
        out.sort_by_key(|a| (a.ordinal(), a.id));
        out
    }

    /// Tracked addresses in a routing-domain bucket, any tenant. Used for
    /// block-level occupancy and availability, where the block's domain is
    /// the isolation boundary.
    pub fn addresses_in_domain(&self, domain: Option<&str>) -> Vec<&SingleAddress> {
        let mut out: Vec<&SingleAddress> = self
            .addresses
            .values()
            .filter(|a| a.domain.as_deref() == domain)
            .collect();
        out.sort_by_key(|a| (a.ordinal(), a.id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockStatus;

    #[test]
    fn test_scope_query_is_ordered_and_isolated() {
        let mut t = Tables::new();
        let scope = ScopeKey::Block { domain: None };
        t.insert_block(Prefix::parse("10.2.0.0/16").unwrap(), None, BlockStatus::Active);
        t.insert_block(Prefix::parse("10.1.0.0/16").unwrap(), None, BlockStatus::Active);
        t.insert_block(
            Prefix::parse("10.3.0.0/16").unwrap(),
            Some("backbone".to_string()),
            BlockStatus::Active,
        );

        let in_global = t.blocks_in_scope(&scope);
        assert_eq!(in_global.len(), 2);
        assert_eq!(in_global[0].prefix.to_string(), "10.1.0.0/16");
        assert_eq!(in_global[1].prefix.to_string(), "10.2.0.0/16");
    }

    #[test]
    fn test_children_lookup_by_back_reference() {
        let mut t = Tables::new();
        let parent = t.insert_block(Prefix::parse("10.0.0.0/8").unwrap(), None, BlockStatus::Active);
        let child = t.insert_block(Prefix::parse("10.1.0.0/16").unwrap(), None, BlockStatus::Active);
        t.block_mut(child).unwrap().parent_id = Some(parent);

        assert_eq!(t.children_of(parent), vec![child]);
        assert!(t.children_of(child).is_empty());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut t = Tables::new();
        let a = t.insert_block(Prefix::parse("10.0.0.0/8").unwrap(), None, BlockStatus::Active);
        t.remove_block(a);
        let b = t.insert_block(Prefix::parse("10.0.0.0/8").unwrap(), None, BlockStatus::Active);
        assert_ne!(a, b);
    }
}
