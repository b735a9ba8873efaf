//! Scope keys: the partition boundaries for uniqueness and overlap rules.
//!
//! A scope key names the bucket within which values must be unique and
//! ranges must not overlap. Different buckets never conflict regardless of
//! numeric overlap. An absent routing domain ("global") is its own bucket,
//! not a wildcard.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Partition key for an inventory entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKey {
    /// Network blocks partition by routing domain.
    Block { domain: Option<String> },
    /// IP allocation ranges partition by routing domain and tenant.
    IpRange {
        domain: Option<String>,
        tenant: Option<String>,
    },
    /// ASN ranges partition by registry and tenant.
    AsnRange {
        registry: Option<String>,
        tenant: Option<String>,
    },
    /// VLAN id ranges partition by site.
    VlanGroup { site: Option<String> },
    /// Tracked single addresses partition by routing domain and tenant.
    Address {
        domain: Option<String>,
        tenant: Option<String>,
    },
}

impl ScopeKey {
    /// The routing-domain component, for entities that have one.
    pub fn domain(&self) -> Option<&str> {
        match self {
            ScopeKey::Block { domain }
            | ScopeKey::IpRange { domain, .. }
            | ScopeKey::Address { domain, .. } => domain.as_deref(),
            ScopeKey::AsnRange { .. } | ScopeKey::VlanGroup { .. } => None,
        }
    }
}

fn bucket(label: &str, value: &Option<String>) -> String {
    match value {
        Some(v) => format!("{}={}", label, v),
        None => format!("{}=global", label),
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Block { domain } => write!(f, "block[{}]", bucket("domain", domain)),
            ScopeKey::IpRange { domain, tenant } => write!(
                f,
                "ip-range[{}, {}]",
                bucket("domain", domain),
                bucket("tenant", tenant)
            ),
            ScopeKey::AsnRange { registry, tenant } => write!(
                f,
                "asn-range[{}, {}]",
                bucket("registry", registry),
                bucket("tenant", tenant)
            ),
            ScopeKey::VlanGroup { site } => write!(f, "vlan-group[{}]", bucket("site", site)),
            ScopeKey::Address { domain, tenant } => write!(
                f,
                "address[{}, {}]",
                bucket("domain", domain),
                bucket("tenant", tenant)
            ),
        }
    }
}

/// Capability for deriving the partition key from an entity, so the overlap
/// and uniqueness checks stay generic over entity kinds.
pub trait Scoped {
    fn scope_key(&self) -> ScopeKey;
}
