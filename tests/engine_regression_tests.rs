#[cfg(test)]
mod engine_regression_tests {
    use std::net::IpAddr;

    use addrspace::audit::audit_tables;
    use addrspace::engine::InventoryEngine;
    use addrspace::error::EngineError;
    use addrspace::model::{BlockStatus, EntityId, RangeKind};
    use addrspace::prefix::{addr_ordinal, Family, Prefix};
    use addrspace::store::{MemoryStore, Store};

    fn block<S: Store>(engine: &InventoryEngine<S>, cidr: &str, domain: Option<&str>) -> EntityId {
        engine
            .create_block(
                Prefix::parse(cidr).unwrap(),
                domain.map(|d| d.to_string()),
                BlockStatus::Active,
            )
            .unwrap()
    }

    fn parent_of<S: Store>(engine: &InventoryEngine<S>, id: EntityId) -> Option<EntityId> {
        engine
            .store()
            .read(|t| t.block(id).map(|b| b.parent_id))
            .unwrap()
    }

    fn depth_of<S: Store>(engine: &InventoryEngine<S>, id: EntityId) -> u32 {
        engine.store().read(|t| t.block(id).unwrap().depth)
    }

    fn child_count_of<S: Store>(engine: &InventoryEngine<S>, id: EntityId) -> u64 {
        engine.store().read(|t| t.block(id).unwrap().child_count)
    }

    /// Insert order must not influence the final hierarchy
    #[test]
    fn test_containment_parent_either_order() {
        // General then specific
        let engine = InventoryEngine::in_memory();
        let a = block(&engine, "10.0.0.0/8", None);
        let b = block(&engine, "10.1.0.0/16", None);
        assert_eq!(parent_of(&engine, b), Some(a));
        assert_eq!(depth_of(&engine, b), depth_of(&engine, a) + 1);

        // Specific then general
        let engine = InventoryEngine::in_memory();
        let b = block(&engine, "10.1.0.0/16", None);
        let a = block(&engine, "10.0.0.0/8", None);
        assert_eq!(parent_of(&engine, b), Some(a));
        assert_eq!(depth_of(&engine, b), depth_of(&engine, a) + 1);
    }

    /// child_count must equal the live child set after any mutation sequence
    #[test]
    fn test_child_count_matches_live_children() {
        let engine = InventoryEngine::in_memory();
        let root = block(&engine, "10.0.0.0/8", None);
        let mid = block(&engine, "10.1.0.0/16", None);
        let leaf_a = block(&engine, "10.1.1.0/24", None);
        let _leaf_b = block(&engine, "10.1.2.0/24", None);

        let check = |engine: &InventoryEngine<MemoryStore>| {
            engine.store().read(|t| {
                for b in t.blocks().collect::<Vec<_>>() {
                    assert_eq!(
                        b.child_count,
                        t.children_of(b.id).len() as u64,
                        "block {} counter drifted",
                        b.prefix
                    );
                }
            })
        };
        check(&engine);
        assert_eq!(child_count_of(&engine, mid), 2);

        engine.delete_block(leaf_a).unwrap();
        check(&engine);
        assert_eq!(child_count_of(&engine, mid), 1);

        engine.delete_block(mid).unwrap();
        check(&engine);
        assert_eq!(child_count_of(&engine, root), 1);
    }

    /// Deleting a block with children re-parents them by containment
    #[test]
    fn test_delete_with_children_reparents_to_grandparent() {
        let engine = InventoryEngine::in_memory();
        let grandparent = block(&engine, "10.0.0.0/8", None);
        let parent = block(&engine, "10.1.0.0/16", None);
        let child = block(&engine, "10.1.2.0/24", None);
        assert_eq!(parent_of(&engine, child), Some(parent));

        engine.delete_block(parent).unwrap();
        assert_eq!(parent_of(&engine, child), Some(grandparent));
        assert_eq!(depth_of(&engine, child), 1);
        assert_eq!(child_count_of(&engine, grandparent), 1);
        assert!(engine.store().read(audit_tables).is_empty());
    }

    /// Without a containing block left, orphans become roots
    #[test]
    fn test_delete_with_children_orphans_become_roots() {
        let engine = InventoryEngine::in_memory();
        let parent = block(&engine, "10.1.0.0/16", None);
        let child = block(&engine, "10.1.2.0/24", None);

        engine.delete_block(parent).unwrap();
        assert_eq!(parent_of(&engine, child), None);
        assert_eq!(depth_of(&engine, child), 0);
        assert!(engine.store().read(audit_tables).is_empty());
    }

    /// Boundary-touching ranges conflict; adjacent ones do not
    #[test]
    fn test_overlap_boundaries() {
        let engine = InventoryEngine::in_memory();
        engine
            .create_range(RangeKind::Asn { registry: None, tenant: None }, 10, 20)
            .unwrap();

        let err = engine
            .create_range(RangeKind::Asn { registry: None, tenant: None }, 20, 30)
            .unwrap_err();
        assert!(matches!(err, EngineError::Overlap { .. }));

        engine
            .create_range(RangeKind::Asn { registry: None, tenant: None }, 21, 30)
            .unwrap();
    }

    /// The conflict error names the existing range and its scope
    #[test]
    fn test_overlap_error_carries_context() {
        let engine = InventoryEngine::in_memory();
        engine
            .create_range(
                RangeKind::Vlan {
                    site: Some("fra1".to_string()),
                },
                100,
                199,
            )
            .unwrap();
        let err = engine
            .create_range(
                RangeKind::Vlan {
                    site: Some("fra1".to_string()),
                },
                150,
                250,
            )
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("100-199"), "got: {}", message);
        assert!(message.contains("fra1"), "got: {}", message);
    }

    /// Longest-prefix match picks the most specific covering block
    #[test]
    fn test_longest_prefix_match() {
        let engine = InventoryEngine::in_memory();
        let eight = block(&engine, "10.0.0.0/8", None);
        let sixteen = block(&engine, "10.1.0.0/16", None);

        let inside_16: IpAddr = "10.1.2.3".parse().unwrap();
        let outside_16: IpAddr = "10.2.2.3".parse().unwrap();
        let outside_all: IpAddr = "172.16.0.1".parse().unwrap();

        assert_eq!(
            engine.match_address(&inside_16, None).map(|h| h.block_id),
            Some(sixteen)
        );
        assert_eq!(
            engine.match_address(&outside_16, None).map(|h| h.block_id),
            Some(eight)
        );
        assert!(engine.match_address(&outside_all, None).is_none());
    }

    /// Utilization: child blocks and tracked addresses combine through max
    #[test]
    fn test_utilization_block_figures() {
        let engine = InventoryEngine::in_memory();
        let parent = block(&engine, "192.168.1.0/24", None);
        block(&engine, "192.168.1.128/25", None);

        let report = engine.block_utilization(parent);
        assert_eq!(report.total, 256);
        assert!((report.percentage - 50.0).abs() < f64::EPSILON);

        let engine = InventoryEngine::in_memory();
        let parent = block(&engine, "192.168.1.0/24", None);
        for i in 1..=200u32 {
            let addr = IpAddr::V4(std::net::Ipv4Addr::from(0xC0A8_0100u32 + i));
            engine.create_address(addr, None, None).unwrap();
        }
        let report = engine.block_utilization(parent);
        assert_eq!(report.used, 200);
        assert!((report.percentage - 78.125).abs() < 1e-9);
    }

    /// Re-applying an unchanged block must not move any counter
    #[test]
    fn test_update_is_idempotent() {
        let engine = InventoryEngine::in_memory();
        let parent = block(&engine, "10.0.0.0/8", None);
        let child = block(&engine, "10.1.0.0/16", None);

        engine
            .update_block(child, Prefix::parse("10.1.0.0/16").unwrap(), None, BlockStatus::Active)
            .unwrap();
        engine
            .update_block(child, Prefix::parse("10.1.0.0/16").unwrap(), None, BlockStatus::Active)
            .unwrap();
        assert_eq!(child_count_of(&engine, parent), 1);
        assert_eq!(parent_of(&engine, child), Some(parent));
    }

    /// Value -> ordinal -> value round trip is lossless
    #[test]
    fn test_value_round_trip() {
        for cidr in ["10.0.0.0/8", "192.168.1.128/25", "2001:db8::/32", "::/0"] {
            let p = Prefix::parse(cidr).unwrap();
            let rebuilt = Prefix::from_ordinal(p.first_ordinal(), p.mask_len(), p.family()).unwrap();
            assert_eq!(rebuilt.to_string(), cidr);
        }
    }

    /// Moving a block across domains repairs both neighborhoods
    #[test]
    fn test_update_across_domains() {
        let engine = InventoryEngine::in_memory();
        let global_parent = block(&engine, "10.0.0.0/8", None);
        let moved = block(&engine, "10.1.0.0/16", None);
        let backbone_parent = block(&engine, "10.0.0.0/8", Some("backbone"));
        assert_eq!(parent_of(&engine, moved), Some(global_parent));

        engine
            .update_block(
                moved,
                Prefix::parse("10.1.0.0/16").unwrap(),
                Some("backbone".to_string()),
                BlockStatus::Active,
            )
            .unwrap();
        assert_eq!(parent_of(&engine, moved), Some(backbone_parent));
        assert_eq!(child_count_of(&engine, global_parent), 0);
        assert_eq!(child_count_of(&engine, backbone_parent), 1);
        assert!(engine.store().read(audit_tables).is_empty());
    }

    /// The audit sweep catches a hand-corrupted counter
    #[test]
    fn test_audit_detects_drift() {
        let engine = InventoryEngine::in_memory();
        let parent = block(&engine, "10.0.0.0/8", None);
        block(&engine, "10.1.0.0/16", None);
        assert!(engine.store().read(audit_tables).is_empty());

        engine
            .store()
            .transact(|t| {
                t.block_mut(parent).unwrap().child_count = 9;
                Ok(())
            })
            .unwrap();
        let findings = engine.store().read(audit_tables);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].problem.contains("child_count"));
    }

    /// Free-address enumeration respects exclusions, order and cap
    #[test]
    fn test_available_addresses_contract() {
        let engine = InventoryEngine::in_memory();
        let id = block(&engine, "192.168.1.0/29", None);
        engine
            .create_address("192.168.1.2".parse().unwrap(), None, None)
            .unwrap();

        let free = engine.available_addresses(id, None).unwrap();
        let rendered: Vec<String> = free.iter().map(|a| a.to_string()).collect();
        // Network and broadcast excluded, the tracked host skipped.
        assert_eq!(
            rendered,
            vec!["192.168.1.1", "192.168.1.3", "192.168.1.4", "192.168.1.5", "192.168.1.6"]
        );

        let capped = engine.available_addresses(id, Some(2)).unwrap();
        assert_eq!(capped.len(), 2);

        assert_eq!(
            engine.first_available(id).unwrap().map(|a| a.to_string()),
            Some("192.168.1.1".to_string())
        );
    }

    /// Range utilization over a tenant's IP range
    #[test]
    fn test_range_utilization_figures() {
        let engine = InventoryEngine::in_memory();
        let start = addr_ordinal(&"10.0.0.10".parse().unwrap());
        let end = addr_ordinal(&"10.0.0.29".parse().unwrap());
        let id = engine
            .create_range(
                RangeKind::Ip {
                    family: Family::V4,
                    domain: None,
                    tenant: None,
                },
                start,
                end,
            )
            .unwrap();
        for host in [11u8, 12, 13, 14, 15] {
            let addr = IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, host));
            engine.create_address(addr, None, None).unwrap();
        }

        let report = engine.range_utilization(id);
        assert_eq!(report.total, 20);
        assert_eq!(report.used, 5);
        assert!((report.percentage - 25.0).abs() < f64::EPSILON);
    }
}
