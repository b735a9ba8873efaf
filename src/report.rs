//! JSON inventory report.
//!
//! `check` emits a machine-readable snapshot of the replayed inventory, with
//! the engine-maintained hierarchy columns and per-entity occupancy, for
//! downstream tooling to consume.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::Serialize;

use crate::engine::{utilization, UtilizationReport};
use crate::model::EntityId;
use crate::store::{Store, Tables};

#[derive(Debug, Serialize)]
pub struct BlockRecord {
    pub id: EntityId,
    pub cidr: String,
    pub domain: Option<String>,
    pub parent_id: Option<EntityId>,
    pub depth: u32,
    pub child_count: u64,
    pub status: crate::model::BlockStatus,
    pub utilization: UtilizationReport,
}

#[derive(Debug, Serialize)]
pub struct RangeRecord {
    pub id: EntityId,
    pub kind: String,
    pub value: String,
    pub scope: String,
    pub utilization: UtilizationReport,
}

#[derive(Debug, Serialize)]
pub struct InventoryReport {
    pub generated_at: DateTime<Utc>,
    pub blocks: Vec<BlockRecord>,
    pub ranges: Vec<RangeRecord>,
    pub address_count: usize,
}

/// Snapshot the tables into a report, stable-ordered by id.
pub fn build_report(tables: &Tables) -> InventoryReport {
    use crate::scope::Scoped;

    let mut blocks: Vec<BlockRecord> = tables
        .blocks()
        .map(|b| BlockRecord {
            id: b.id,
            cidr: b.prefix.to_string(),
            domain: b.domain.clone(),
            parent_id: b.parent_id,
            depth: b.depth,
            child_count: b.child_count,
            status: b.status,
            utilization: utilization::block_utilization(tables, b.id),
        })
        .collect();
    blocks.sort_by_key(|b| b.id);

    let mut ranges: Vec<RangeRecord> = tables
        .ranges()
        .map(|r| RangeRecord {
            id: r.id,
            kind: r.kind.label().to_string(),
            value: r.display_value(),
            scope: r.scope_key().to_string(),
            utilization: utilization::range_utilization(tables, r.id),
        })
        .collect();
    ranges.sort_by_key(|r| r.id);

    InventoryReport {
        generated_at: Utc::now(),
        blocks,
        ranges,
        address_count: tables.addresses().count(),
    }
}

/// Build the report from an engine's store.
pub fn report_from<S: Store>(store: &S) -> InventoryReport {
    store.read(build_report)
}

/// Serialize the report to pretty JSON at `path`.
pub fn write_report(report: &InventoryReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).wrap_err("Failed to serialize report")?;
    fs::write(path, json)
        .wrap_err_with(|| format!("Failed to write report to '{}'", path.display()))?;
    info!(
        "Wrote inventory report ({} blocks, {} ranges) to {:?}",
        report.blocks.len(),
        report.ranges.len(),
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockStatus;
    use crate::prefix::Prefix;

    #[test]
    fn test_report_carries_hierarchy_columns() {
        let mut t = Tables::new();
        let parent =
            t.insert_block(Prefix::parse("10.0.0.0/8").unwrap(), None, BlockStatus::Active);
        let child =
            t.insert_block(Prefix::parse("10.1.0.0/16").unwrap(), None, BlockStatus::Active);
        crate::engine::hierarchy::attach(&mut t, child);

        let report = build_report(&t);
        assert_eq!(report.blocks.len(), 2);
        let child_rec = report.blocks.iter().find(|b| b.id == child).unwrap();
        assert_eq!(child_rec.parent_id, Some(parent));
        assert_eq!(child_rec.depth, 1);
    }
}
