//! Meshward Rating - Peer reputation
//!
//! Keeps a bounded score per peer and ranks candidate peers by it.
//!
//! # Architecture
//!
//! ```text
//!   increase / decrease
//!          │
//!          ▼
//! ┌──────────────────────┐   rating >= 0   ┌──────────────────┐
//! │  PeersRatingHandler  │ ──────────────▶ │  top rated cache │
//! │   (striped locks)    │                 └──────────────────┘
//! │                      │   rating < 0    ┌──────────────────┐
//! │                      │ ──────────────▶ │  bad rated cache │
//! └──────────────────────┘                 └──────────────────┘
//! ```

mod cache;
mod error;
mod handler;

// Re-exports: Error types
pub use error::RatingError;

// Re-exports: Caches
pub use cache::{LruRatingCache, RatingCache};

// Re-exports: Handler
pub use handler::{
    PeersRatingHandler, PeersRatingHandlerArgs, DECREASE_FACTOR, DEFAULT_RATING, INCREASE_FACTOR,
    MAX_RATING, MIN_RATING,
};
