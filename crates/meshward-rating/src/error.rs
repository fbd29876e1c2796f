//! Error types for the rating module

use thiserror::Error;

/// Rating error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// A rating cache was configured without room for any peer
    #[error("Invalid capacity for {0}: must be positive")]
    InvalidCacheCapacity(&'static str),
}
