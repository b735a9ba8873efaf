//! Inventory file definition and loading.
//!
//! The CLI feeds the engine from a YAML inventory file. Entries here are the
//! raw, human-written forms; semantic checks (canonical CIDR, overlap,
//! uniqueness) belong to the engine and run when the inventory is replayed.

use std::fs::File;
use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::BlockStatus;

/// A declarative inventory: blocks, allocation ranges and tracked addresses.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Inventory {
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
    #[serde(default)]
    pub ranges: Vec<RangeEntry>,
    #[serde(default)]
    pub addresses: Vec<AddressEntry>,
}

/// One CIDR block under management.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BlockEntry {
    pub cidr: String,
    /// Routing domain; omitted means the global bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BlockStatus>,
}

/// One allocation range. The variant is selected by which key is present
/// (`ip:`, `asn:` or `vlan:`), each written as `"start-end"` or a single
/// value.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum RangeEntry {
    Ip {
        ip: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tenant: Option<String>,
    },
    Asn {
        asn: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        registry: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tenant: Option<String>,
    },
    Vlan {
        vlan: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        site: Option<String>,
    },
}

impl RangeEntry {
    pub fn literal(&self) -> &str {
        match self {
            RangeEntry::Ip { ip, .. } => ip,
            RangeEntry::Asn { asn, .. } => asn,
            RangeEntry::Vlan { vlan, .. } => vlan,
        }
    }
}

/// One individually tracked address.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AddressEntry {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

/// Inventory file validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid block entry: {0}")]
    InvalidBlock(String),
    #[error("Invalid range entry: {0}")]
    InvalidRange(String),
    #[error("Invalid address entry: {0}")]
    InvalidAddress(String),
}

impl Inventory {
    /// Shape-level validation; the engine does the semantic checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for block in &self.blocks {
            if block.cidr.trim().is_empty() {
                return Err(ConfigError::InvalidBlock("cidr cannot be empty".to_string()));
            }
        }
        for range in &self.ranges {
            if range.literal().trim().is_empty() {
                return Err(ConfigError::InvalidRange(
                    "range value cannot be empty".to_string(),
                ));
            }
            split_range_literal(range.literal())?;
        }
        for address in &self.addresses {
            if address.ip.trim().is_empty() {
                return Err(ConfigError::InvalidAddress("ip cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Split a `"start-end"` (or single-value) literal into its endpoint
/// strings. IPv6 endpoints contain no `-`, so the split is unambiguous.
pub fn split_range_literal(literal: &str) -> Result<(String, String), ConfigError> {
    let re = Regex::new(r"^\s*([^\s-]+)\s*(?:-\s*([^\s-]+)\s*)?$")
        .map_err(|e| ConfigError::InvalidRange(e.to_string()))?;
    let captures = re.captures(literal).ok_or_else(|| {
        ConfigError::InvalidRange(format!(
            "'{}' is not a 'start-end' or single value",
            literal
        ))
    })?;
    let start = captures[1].to_string();
    let end = captures
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| start.clone());
    Ok((start, end))
}

/// Load and shape-validate an inventory from a YAML file.
pub fn load_inventory(path: &Path) -> Result<Inventory> {
    info!("Loading inventory from: {:?}", path);

    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open inventory file '{}'", path.display()))?;
    let inventory: Inventory = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse inventory file '{}'", path.display()))?;

    inventory.validate()?;

    info!(
        "Loaded inventory: {} blocks, {} ranges, {} addresses",
        inventory.blocks.len(),
        inventory.ranges.len(),
        inventory.addresses.len()
    );
    Ok(inventory)
}
