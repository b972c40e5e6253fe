//! Error types for the markup engine
//!
//! Text rewrites are total and never fail. The only failure sources are the
//! HTML tree parse and the external user lookup.

use thiserror::Error;

use crate::markup::Dialect;

/// Hard failures surfaced by the engine
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("Failed to parse HTML content: {0}")]
    Parse(String),

    #[error("No converter from {from} to {to}")]
    UnsupportedConversion { from: Dialect, to: Dialect },
}

/// Failure of the external identity lookup
///
/// Always recovered locally: callers fall back to identifier-based text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("No user lookup configured")]
    NotConfigured,

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User lookup failed: {0}")]
    Unavailable(String),
}
