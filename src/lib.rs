//! # Addrspace - Address-space bookkeeping engine for network inventory
//!
//! This library provides the core bookkeeping for a network-inventory
//! platform: a containment hierarchy over CIDR blocks, non-overlap
//! enforcement for allocation ranges, longest-prefix-match lookups, and
//! occupancy accounting.
//!
//! ## Overview
//!
//! Inventory entities live in three tables: network blocks (CIDR values
//! partitioned by routing domain), allocation ranges (closed ordinal
//! intervals for IP, ASN and VLAN-id allocations, each with its own scope
//! shape), and individually tracked addresses. Every mutation runs inside a
//! single store transaction that also repairs the derived hierarchy columns
//! (`parent_id`, `depth`, `child_count`), so the persisted state is always
//! consistent between transactions.
//!
//! ## Key Features
//!
//! - **Containment hierarchy**: parent, depth and child counters derived
//!   from actual CIDR containment, independent of insertion order
//! - **Overlap enforcement**: one closed-interval validator shared by IP,
//!   ASN and VLAN ranges, with boundary-inclusive semantics
//! - **Longest-prefix match**: most specific covering block, with global
//!   blocks visible from every routing domain
//! - **Occupancy**: percentage reports for blocks and ranges, free-address
//!   enumeration with caller-supplied caps
//! - **Drift audit**: parallel sweep validating every invariant offline
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: inventory file structures and YAML parsing
//! - `error`: the engine error taxonomy
//! - `prefix`: CIDR values, address families and ordinal arithmetic
//! - `scope`: partition keys bounding uniqueness and overlap rules
//! - `model`: persisted entity shapes
//! - `store`: the persistence seam and the in-memory reference store
//! - `engine`: hierarchy, overlap, matching, utilization and enumeration
//! - `audit`: offline invariant sweep
//! - `report`: JSON inventory reports
//! - `orchestrator`: replay of inventory files into the engine
//!
//! ## Example Usage
//!
//! ```rust
//! use addrspace::engine::InventoryEngine;
//! use addrspace::model::BlockStatus;
//! use addrspace::prefix::Prefix;
//!
//! let engine = InventoryEngine::in_memory();
//! engine.create_block(Prefix::parse("10.0.0.0/8")?, None, BlockStatus::Active)?;
//! engine.create_block(Prefix::parse("10.1.0.0/16")?, None, BlockStatus::Active)?;
//!
//! let hit = engine.match_address(&"10.1.2.3".parse()?, None);
//! assert_eq!(hit.map(|h| h.prefix.to_string()), Some("10.1.0.0/16".to_string()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! The engine raises the typed [`error::EngineError`] taxonomy; every
//! mutation failure aborts its transaction atomically. The binary layer
//! wraps these in `color_eyre` reports with file/entry context.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod prefix;
pub mod report;
pub mod scope;
pub mod store;
