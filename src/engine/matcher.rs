//! Longest-prefix matching against the persisted block set.

use std::net::IpAddr;

use serde::Serialize;

use crate::model::{EntityId, NetworkBlock};
use crate::prefix::{Family, Prefix};
use crate::scope::ScopeKey;
use crate::store::Tables;

/// The covering block returned by a successful match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoveringBlock {
    pub block_id: EntityId,
    pub prefix: Prefix,
    pub domain: Option<String>,
}

impl From<&NetworkBlock> for CoveringBlock {
    fn from(block: &NetworkBlock) -> Self {
        CoveringBlock {
            block_id: block.id,
            prefix: block.prefix,
            domain: block.domain.clone(),
        }
    }
}

/// Return the most specific block covering `addr`.
///
/// Candidates are the blocks of the given routing domain plus the global
/// bucket: global blocks are visible from every domain, domain blocks only
/// within theirs. `None` means no covering block is configured yet; that is
/// an expected outcome, not a fault.
///
/// Two blocks with the same mask cannot both cover the address unless the
/// uniqueness invariant was violated by pre-existing drift; such ties are
/// resolved deterministically by (mask desc, value asc, id asc) rather than
/// whatever order the rows come back in.
pub fn match_address(tables: &Tables, addr: &IpAddr, domain: Option<&str>) -> Option<CoveringBlock> {
    let family = Family::of(addr);
    let mut candidates: Vec<&NetworkBlock> = Vec::new();
    candidates.extend(tables.blocks_in_scope(&ScopeKey::Block { domain: None }));
    if let Some(d) = domain {
        candidates.extend(tables.blocks_in_scope(&ScopeKey::Block {
            domain: Some(d.to_string()),
        }));
    }

    candidates
        .into_iter()
        .filter(|b| b.family() == family && b.prefix.contains_addr(addr))
        .max_by(|a, b| {
            a.prefix
                .mask_len()
                .cmp(&b.prefix.mask_len())
                .then(b.prefix.first_ordinal().cmp(&a.prefix.first_ordinal()))
                .then(b.id.cmp(&a.id))
        })
        .map(CoveringBlock::from)
}
