use crate::infrastructure::error::InfraError;
use thiserror::Error;

/// Errors raised by the itinerary engine and the commands built on it.
///
/// Every variant is recoverable at the UI boundary: the caller shows the
/// message inline and keeps the user's edit around for a retry.
#[derive(Debug, Error)]
pub enum ItineraryError {
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("invalid time range: {0}")]
    InvalidRange(String),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] InfraError),
}
