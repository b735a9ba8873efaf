//! Persisted entity shapes for the inventory engine.
//!
//! `parent_id`, `depth` and `child_count` on [`NetworkBlock`] are derived,
//! engine-maintained columns. They are recomputed inside the same transaction
//! as any mutation that changes a block's value or scope and must never be
//! written by callers.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prefix::{addr_ordinal, ordinal_addr, Family, Prefix};
use crate::scope::{ScopeKey, Scoped};

/// Store-assigned entity id.
pub type EntityId = u64;

/// Lowest VLAN id assignable to a port group.
pub const VLAN_MIN: u128 = 1;
/// Highest VLAN id assignable to a port group.
pub const VLAN_MAX: u128 = 4094;

/// Lifecycle tag on a network block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Active,
    Reserved,
    Deprecated,
}

impl Default for BlockStatus {
    fn default() -> Self {
        BlockStatus::Active
    }
}

/// A CIDR block under management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkBlock {
    pub id: EntityId,
    pub prefix: Prefix,
    /// Routing-domain bucket; `None` is the global bucket.
    pub domain: Option<String>,
    /// Derived: most specific strictly-containing block in the same scope.
    pub parent_id: Option<EntityId>,
    /// Derived: 0 for roots, `parent.depth + 1` otherwise.
    pub depth: u32,
    /// Derived: live count of blocks whose parent is this block.
    pub child_count: u64,
    pub status: BlockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NetworkBlock {
    pub fn family(&self) -> Family {
        self.prefix.family()
    }
}

impl Scoped for NetworkBlock {
    fn scope_key(&self) -> ScopeKey {
        ScopeKey::Block {
            domain: self.domain.clone(),
        }
    }
}

/// Entity kind and per-kind scope fields of an allocation range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    Ip {
        family: Family,
        domain: Option<String>,
        tenant: Option<String>,
    },
    Asn {
        registry: Option<String>,
        tenant: Option<String>,
    },
    Vlan {
        site: Option<String>,
    },
}

impl RangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            RangeKind::Ip { .. } => "ip",
            RangeKind::Asn { .. } => "asn",
            RangeKind::Vlan { .. } => "vlan",
        }
    }
}

/// A closed interval of ordinals (IP values, ASNs, or VLAN ids).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRange {
    pub id: EntityId,
    pub kind: RangeKind,
    pub start: u128,
    pub end: u128,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AllocationRange {
    /// Render an endpoint in the kind's native notation.
    pub(crate) fn endpoint_str(&self, ordinal: u128) -> String {
        match &self.kind {
            RangeKind::Ip { family, .. } => match ordinal_addr(ordinal, *family) {
                Some(addr) => addr.to_string(),
                None => ordinal.to_string(),
            },
            RangeKind::Asn { .. } | RangeKind::Vlan { .. } => ordinal.to_string(),
        }
    }

    /// Human-readable `start-end` form used in logs and conflict errors.
    pub fn display_value(&self) -> String {
        format!(
            "{}-{}",
            self.endpoint_str(self.start),
            self.endpoint_str(self.end)
        )
    }

    /// Number of ordinals the range spans.
    pub fn span(&self) -> u128 {
        self.end - self.start + 1
    }
}

impl Scoped for AllocationRange {
    fn scope_key(&self) -> ScopeKey {
        match &self.kind {
            RangeKind::Ip { domain, tenant, .. } => ScopeKey::IpRange {
                domain: domain.clone(),
                tenant: tenant.clone(),
            },
            RangeKind::Asn { registry, tenant } => ScopeKey::AsnRange {
                registry: registry.clone(),
                tenant: tenant.clone(),
            },
            RangeKind::Vlan { site } => ScopeKey::VlanGroup { site: site.clone() },
        }
    }
}

impl fmt::Display for AllocationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.display_value())
    }
}

/// One individually tracked address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleAddress {
    pub id: EntityId,
    pub addr: IpAddr,
    pub domain: Option<String>,
    pub tenant: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SingleAddress {
    pub fn family(&self) -> Family {
        Family::of(&self.addr)
    }

    pub fn ordinal(&self) -> u128 {
        addr_ordinal(&self.addr)
    }
}

impl Scoped for SingleAddress {
    fn scope_key(&self) -> ScopeKey {
        ScopeKey::Address {
            domain: self.domain.clone(),
            tenant: self.tenant.clone(),
        }
    }
}
