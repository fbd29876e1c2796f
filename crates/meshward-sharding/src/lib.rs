//! Meshward Sharding - Connection budgets for connected peers
//!
//! Decides which connected peers to disconnect once the connection budgets
//! are exceeded.
//!
//! # Architecture
//!
//! ```text
//! Connected peers snapshot
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │   PeerShardResolver     │  Which role / shard?
//! └───────────┬─────────────┘
//!             │
//!             ▼
//! ┌─────────────────────────┐
//! │        Sharder          │  Which bucket is over quota?
//! │ (Lists / OneList / Nil) │  Which members can go?
//! └───────────┬─────────────┘
//!             │
//!             ▼
//!      Eviction list
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use meshward_sharding::{new_sharder, SharderFactoryArgs};
//!
//! let sharder = new_sharder(args)?;
//! let evicted = sharder.compute_eviction_list(&connected);
//! ```

// Core modules
mod error;
mod types;

pub mod distance;
mod factory;
mod sharder;

// Re-exports: Error types
pub use error::ShardingError;

// Re-exports: Core types
pub use types::{
    PeerBucket, ShardingQuotas, LISTS_SHARDER_NAME, NIL_LIST_SHARDER_NAME, ONE_LIST_SHARDER_NAME,
};

// Re-exports: Sharders
pub use factory::{new_sharder, SharderFactoryArgs};
pub use sharder::{
    ListsSharder, ListsSharderArgs, NilListSharder, OneListSharder, SeederSet, Sharder,
};
