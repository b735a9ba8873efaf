//! Inventory orchestrator.
//!
//! This module coordinates the replay of a declarative inventory file into
//! the engine: parse each entry, derive its ordinals and scope, and run it
//! through the corresponding mutation entry point. The first failing entry
//! aborts the replay with the offending entry named in the error context.

use std::net::IpAddr;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;

use crate::config::{split_range_literal, AddressEntry, BlockEntry, Inventory, RangeEntry};
use crate::engine::InventoryEngine;
use crate::model::RangeKind;
use crate::prefix::{addr_ordinal, Family, Prefix};
use crate::store::Store;

/// Counts of successfully applied entries.
#[derive(Debug, Default, PartialEq)]
pub struct ApplyStats {
    pub blocks: usize,
    pub ranges: usize,
    pub addresses: usize,
}

/// Replay a whole inventory into the engine.
pub fn apply_inventory<S: Store>(
    engine: &InventoryEngine<S>,
    inventory: &Inventory,
) -> Result<ApplyStats> {
    let mut stats = ApplyStats::default();

    for entry in &inventory.blocks {
        apply_block(engine, entry)
            .wrap_err_with(|| format!("Failed to apply block '{}'", entry.cidr))?;
        stats.blocks += 1;
    }
    for entry in &inventory.ranges {
        apply_range(engine, entry)
            .wrap_err_with(|| format!("Failed to apply range '{}'", entry.literal()))?;
        stats.ranges += 1;
    }
    for entry in &inventory.addresses {
        apply_address(engine, entry)
            .wrap_err_with(|| format!("Failed to apply address '{}'", entry.ip))?;
        stats.addresses += 1;
    }

    info!(
        "Applied inventory: {} blocks, {} ranges, {} addresses",
        stats.blocks, stats.ranges, stats.addresses
    );
    Ok(stats)
}

fn apply_block<S: Store>(engine: &InventoryEngine<S>, entry: &BlockEntry) -> Result<()> {
    let prefix = Prefix::parse(&entry.cidr)?;
    engine.create_block(prefix, entry.domain.clone(), entry.status.unwrap_or_default())?;
    Ok(())
}

fn apply_range<S: Store>(engine: &InventoryEngine<S>, entry: &RangeEntry) -> Result<()> {
    let (start_str, end_str) = split_range_literal(entry.literal())?;
    let (kind, start, end) = match entry {
        RangeEntry::Ip { domain, tenant, .. } => {
            let start_addr = parse_ip(&start_str)?;
            let end_addr = parse_ip(&end_str)?;
            let family = Family::of(&start_addr);
            if Family::of(&end_addr) != family {
                return Err(eyre!(
                    "range endpoints mix address families: {} and {}",
                    start_addr,
                    end_addr
                ));
            }
            (
                RangeKind::Ip {
                    family,
                    domain: domain.clone(),
                    tenant: tenant.clone(),
                },
                addr_ordinal(&start_addr),
                addr_ordinal(&end_addr),
            )
        }
        RangeEntry::Asn { registry, tenant, .. } => (
            RangeKind::Asn {
                registry: registry.clone(),
                tenant: tenant.clone(),
            },
            parse_ordinal(&start_str)?,
            parse_ordinal(&end_str)?,
        ),
        RangeEntry::Vlan { site, .. } => (
            RangeKind::Vlan { site: site.clone() },
            parse_ordinal(&start_str)?,
            parse_ordinal(&end_str)?,
        ),
    };
    engine.create_range(kind, start, end)?;
    Ok(())
}

fn apply_address<S: Store>(engine: &InventoryEngine<S>, entry: &AddressEntry) -> Result<()> {
    let addr = parse_ip(&entry.ip)?;
    engine.create_address(addr, entry.domain.clone(), entry.tenant.clone())?;
    Ok(())
}

fn parse_ip(s: &str) -> Result<IpAddr> {
    s.trim()
        .parse::<IpAddr>()
        .wrap_err_with(|| format!("'{}' is not an IP address", s))
}

fn parse_ordinal(s: &str) -> Result<u128> {
    s.trim()
        .parse::<u128>()
        .wrap_err_with(|| format!("'{}' is not a number", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Inventory;

    fn inventory(yaml: &str) -> Inventory {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_apply_full_inventory() {
        let engine = InventoryEngine::in_memory();
        let inv = inventory(
            r#"
blocks:
  - cidr: "10.0.0.0/8"
  - cidr: "10.1.0.0/16"
ranges:
  - vlan: "100-199"
    site: fra1
addresses:
  - ip: "10.1.0.12"
"#,
        );
        let stats = apply_inventory(&engine, &inv).unwrap();
        assert_eq!(
            stats,
            ApplyStats {
                blocks: 2,
                ranges: 1,
                addresses: 1
            }
        );
    }

    #[test]
    fn test_failing_entry_names_itself() {
        let engine = InventoryEngine::in_memory();
        let inv = inventory(
            r#"
blocks:
  - cidr: "10.0.0.7/8"
"#,
        );
        let err = apply_inventory(&engine, &inv).unwrap_err();
        assert!(format!("{:#}", err).contains("10.0.0.7/8"));
    }

    #[test]
    fn test_mixed_family_range_is_rejected() {
        let engine = InventoryEngine::in_memory();
        let inv = inventory(
            r#"
ranges:
  - ip: "10.0.0.1-2001:db8::1"
"#,
        );
        assert!(apply_inventory(&engine, &inv).is_err());
    }
}
