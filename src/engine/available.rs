//! Free-address enumeration within a block or range.
//!
//! Lists are materialized eagerly because callers need counts and random
//! access. Very large blocks therefore produce very large lists; the `limit`
//! argument is the caller-supplied cap bounding that, it does not change the
//! ordering contract (ascending ordinals, lowest free address first).

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::model::NetworkBlock;
use crate::prefix::{ordinal_addr, Family};

/// Free addresses of `block` in ascending order, excluding everything in
/// `used` and, for IPv4 blocks with mask length below 31, the network and
/// broadcast addresses. IPv6 and IPv4 /31-/32 blocks have no such exclusion.
pub fn available_addresses(
    block: &NetworkBlock,
    used: &BTreeSet<u128>,
    limit: Option<usize>,
) -> Vec<IpAddr> {
    let family = block.family();
    let mut first = block.prefix.first_ordinal();
    let mut last = block.prefix.last_ordinal();
    if family == Family::V4 && block.prefix.mask_len() < 31 {
        first += 1;
        last -= 1;
    }
    enumerate(first, last, family, used, limit)
}

/// Free ordinals of `[start, end]` in ascending order, excluding `used`.
pub fn available_in_span(
    start: u128,
    end: u128,
    family: Family,
    used: &BTreeSet<u128>,
    limit: Option<usize>,
) -> Vec<IpAddr> {
    enumerate(start, end, family, used, limit)
}

fn enumerate(
    first: u128,
    last: u128,
    family: Family,
    used: &BTreeSet<u128>,
    limit: Option<usize>,
) -> Vec<IpAddr> {
    let cap = limit.unwrap_or(usize::MAX);
    let mut out = Vec::new();
    let mut ordinal = first;
    while ordinal <= last && out.len() < cap {
        if !used.contains(&ordinal) {
            if let Some(addr) = ordinal_addr(ordinal, family) {
                out.push(addr);
            }
        }
        if ordinal == u128::MAX {
            break;
        }
        ordinal += 1;
    }
    out
}

/// The lowest free address, or `None` when the block is exhausted.
pub fn first_available(block: &NetworkBlock, used: &BTreeSet<u128>) -> Option<IpAddr> {
    available_addresses(block, used, Some(1)).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockStatus;
    use crate::prefix::{addr_ordinal, Prefix};
    use chrono::Utc;

    fn block(cidr: &str) -> NetworkBlock {
        let now = Utc::now();
        NetworkBlock {
            id: 1,
            prefix: Prefix::parse(cidr).unwrap(),
            domain: None,
            parent_id: None,
            depth: 0,
            child_count: 0,
            status: BlockStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn ords(addrs: &[&str]) -> BTreeSet<u128> {
        addrs
            .iter()
            .map(|a| addr_ordinal(&a.parse().unwrap()))
            .collect()
    }

    #[test]
    fn test_excludes_network_and_broadcast_below_31() {
        let free = available_addresses(&block("192.168.1.0/30"), &BTreeSet::new(), None);
        let rendered: Vec<String> = free.iter().map(|a| a.to_string()).collect();
        assert_eq!(rendered, vec!["192.168.1.1", "192.168.1.2"]);
    }

    #[test]
    fn test_no_exclusion_for_31_and_32() {
        let free = available_addresses(&block("10.0.0.4/31"), &BTreeSet::new(), None);
        assert_eq!(free.len(), 2);
        let free = available_addresses(&block("10.0.0.4/32"), &BTreeSet::new(), None);
        assert_eq!(free.len(), 1);
    }

    #[test]
    fn test_no_exclusion_for_ipv6() {
        let free = available_addresses(&block("2001:db8::/126"), &BTreeSet::new(), None);
        assert_eq!(free.len(), 4);
        assert_eq!(free[0].to_string(), "2001:db8::");
    }

    #[test]
    fn test_used_addresses_are_skipped_in_ascending_order() {
        let used = ords(&["192.168.1.1", "192.168.1.3"]);
        let free = available_addresses(&block("192.168.1.0/29"), &used, None);
        let rendered: Vec<String> = free.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["192.168.1.2", "192.168.1.4", "192.168.1.5", "192.168.1.6"]
        );
    }

    #[test]
    fn test_limit_caps_the_list() {
        let free = available_addresses(&block("10.0.0.0/24"), &BTreeSet::new(), Some(3));
        assert_eq!(free.len(), 3);
        assert_eq!(free[0].to_string(), "10.0.0.1");
    }

    #[test]
    fn test_first_available() {
        let used = ords(&["192.168.1.1"]);
        let b = block("192.168.1.0/29");
        assert_eq!(
            first_available(&b, &used).map(|a| a.to_string()),
            Some("192.168.1.2".to_string())
        );

        // Exhausted /30: both hosts used.
        let used = ords(&["192.168.1.1", "192.168.1.2"]);
        assert_eq!(first_available(&block("192.168.1.0/30"), &used), None);
    }

    #[test]
    fn test_span_enumeration() {
        let start = addr_ordinal(&"10.0.0.10".parse().unwrap());
        let end = addr_ordinal(&"10.0.0.12".parse().unwrap());
        let used = ords(&["10.0.0.11"]);
        let free = available_in_span(start, end, Family::V4, &used, None);
        let rendered: Vec<String> = free.iter().map(|a| a.to_string()).collect();
        assert_eq!(rendered, vec!["10.0.0.10", "10.0.0.12"]);
    }
}
