//! Nil List Sharder, used when sharding is disabled

use meshward_types::PeerId;

use crate::types::NIL_LIST_SHARDER_NAME;

/// Sharder that never evicts anyone
#[derive(Debug, Clone, Copy, Default)]
pub struct NilListSharder;

impl NilListSharder {
    pub fn new() -> Self {
        Self
    }

    pub fn compute_eviction_list(&self, _connected: &[PeerId]) -> Vec<PeerId> {
        Vec::new()
    }

    pub fn name(&self) -> &'static str {
        NIL_LIST_SHARDER_NAME
    }
}
