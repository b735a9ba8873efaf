//! CIDR prefix values and ordinal arithmetic.
//!
//! This file wraps `ipnet` with the canonical-form and ordinal conversions
//! the rest of the engine works in. All interval arithmetic is done on u128
//! ordinals so IPv4 and IPv6 share one code path.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Address family of a block, range endpoint, or tracked address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Number of address bits for this family (32 or 128).
    pub fn addr_bits(&self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    pub fn of(addr: &IpAddr) -> Family {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

/// Convert an address to its integer ordinal.
pub fn addr_ordinal(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// Convert an ordinal back to an address. Returns `None` when the ordinal
/// does not fit the family (IPv4 ordinals above 2^32 - 1).
pub fn ordinal_addr(ordinal: u128, family: Family) -> Option<IpAddr> {
    match family {
        Family::V4 => u32::try_from(ordinal)
            .ok()
            .map(|v| IpAddr::V4(Ipv4Addr::from(v))),
        Family::V6 => Some(IpAddr::V6(Ipv6Addr::from(ordinal))),
    }
}

/// A canonical CIDR value: the address part is always the network base.
///
/// Canonical form is enforced at parse time, which is what makes the
/// value -> ordinal -> value round trip lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prefix {
    net: IpNet,
}

impl Prefix {
    /// Parse a CIDR string, rejecting values with host bits set.
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let net: IpNet = s
            .trim()
            .parse()
            .map_err(|e| EngineError::InvalidValue(format!("bad CIDR '{}': {}", s, e)))?;
        if net.addr() != net.network() {
            return Err(EngineError::InvalidValue(format!(
                "'{}' has host bits set; the network base is {}",
                s,
                net.trunc()
            )));
        }
        Ok(Prefix { net })
    }

    /// Build a prefix from an ordinal and a mask length.
    pub fn from_ordinal(ordinal: u128, mask_len: u8, family: Family) -> Result<Self, EngineError> {
        let addr = ordinal_addr(ordinal, family).ok_or_else(|| {
            EngineError::InvalidValue(format!("ordinal {} does not fit {}", ordinal, family))
        })?;
        let net = IpNet::new(addr, mask_len)
            .map_err(|e| EngineError::InvalidValue(format!("bad mask /{}: {}", mask_len, e)))?;
        if net.addr() != net.network() {
            return Err(EngineError::InvalidValue(format!(
                "ordinal {} is not aligned to /{}",
                ordinal, mask_len
            )));
        }
        Ok(Prefix { net })
    }

    pub fn family(&self) -> Family {
        match self.net {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }

    pub fn mask_len(&self) -> u8 {
        self.net.prefix_len()
    }

    pub fn addr_bits(&self) -> u8 {
        self.family().addr_bits()
    }

    /// Ordinal of the network base address.
    pub fn first_ordinal(&self) -> u128 {
        addr_ordinal(&self.net.network())
    }

    /// Ordinal of the last address in the block (the IPv4 broadcast).
    pub fn last_ordinal(&self) -> u128 {
        addr_ordinal(&self.net.broadcast())
    }

    /// Number of addresses the block spans: `2^(addr_bits - mask_len)`,
    /// saturating at `u128::MAX` for the IPv6 default route.
    pub fn host_capacity(&self) -> u128 {
        let shift = u32::from(self.addr_bits() - self.mask_len());
        if shift >= 128 {
            u128::MAX
        } else {
            1u128 << shift
        }
    }

    /// Whether the block covers the given address. Always false across
    /// address families.
    pub fn contains_addr(&self, addr: &IpAddr) -> bool {
        self.net.contains(addr)
    }

    /// Whether the block covers the given ordinal.
    pub fn contains_ordinal(&self, ordinal: u128, family: Family) -> bool {
        family == self.family()
            && ordinal >= self.first_ordinal()
            && ordinal <= self.last_ordinal()
    }

    /// Proper-superset containment: covers `other` and is not equal to it.
    pub fn strictly_contains(&self, other: &Prefix) -> bool {
        self.net != other.net && self.net.contains(&other.net)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_host_bits() {
        assert!(Prefix::parse("10.0.0.0/8").is_ok());
        assert!(Prefix::parse("10.0.0.1/8").is_err());
        assert!(Prefix::parse("2001:db8::/32").is_ok());
        assert!(Prefix::parse("2001:db8::1/32").is_err());
        assert!(Prefix::parse("not-a-cidr").is_err());
    }

    #[test]
    fn test_ordinal_round_trip() {
        let p = Prefix::parse("192.168.1.0/24").unwrap();
        let rebuilt = Prefix::from_ordinal(p.first_ordinal(), p.mask_len(), p.family()).unwrap();
        assert_eq!(p, rebuilt);
        assert_eq!(rebuilt.to_string(), "192.168.1.0/24");

        let p6 = Prefix::parse("2001:db8:ff00::/40").unwrap();
        let rebuilt6 = Prefix::from_ordinal(p6.first_ordinal(), 40, Family::V6).unwrap();
        assert_eq!(p6, rebuilt6);
    }

    #[test]
    fn test_from_ordinal_rejects_misaligned() {
        let ord = addr_ordinal(&"10.0.0.1".parse().unwrap());
        assert!(Prefix::from_ordinal(ord, 24, Family::V4).is_err());
    }

    #[test]
    fn test_strict_containment() {
        let eight = Prefix::parse("10.0.0.0/8").unwrap();
        let sixteen = Prefix::parse("10.1.0.0/16").unwrap();
        assert!(eight.strictly_contains(&sixteen));
        assert!(!sixteen.strictly_contains(&eight));
        assert!(!eight.strictly_contains(&eight));

        // Never across families
        let v6 = Prefix::parse("::/0").unwrap();
        assert!(!v6.strictly_contains(&eight));
    }

    #[test]
    fn test_host_capacity() {
        assert_eq!(Prefix::parse("192.168.1.0/24").unwrap().host_capacity(), 256);
        assert_eq!(Prefix::parse("10.0.0.4/31").unwrap().host_capacity(), 2);
        assert_eq!(Prefix::parse("::/0").unwrap().host_capacity(), u128::MAX);
    }

    #[test]
    fn test_contains_ordinal_is_family_checked() {
        let p = Prefix::parse("10.0.0.0/8").unwrap();
        let ord = addr_ordinal(&"10.1.2.3".parse().unwrap());
        assert!(p.contains_ordinal(ord, Family::V4));
        assert!(!p.contains_ordinal(ord, Family::V6));
    }
}
