//! Error types for the signaling core

use thiserror::Error;

/// Failures surfaced by signaling operations.
///
/// The variants map one-to-one onto the results a caller can act on:
/// reject the input, report a missing record, fall back because no
/// real-time channel exists, or give up on an unexpected collaborator
/// failure. Routing to an unreachable peer is deliberately *not* an
/// error; the relay reports it as `delivered = false` instead.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Real-time signaling not available")]
    Unavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignalingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SignalingError>;
