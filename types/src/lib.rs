// ========== Core Modules ==========
pub mod peer;

// Export commonly used types
pub use peer::{PeerId, PeerShardInfo, PeerSubType, PeerType, ShardId};
