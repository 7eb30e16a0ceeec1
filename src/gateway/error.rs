//! Gateway Errors
//!
//! Typed outcomes of calls that cross the ledger boundary.

use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Resource, account or table item does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Connection failure, timeout, I/O
    #[error("Transport error: {0}")]
    Transport(String),
    /// Node answered with a non-success status
    #[error("Ledger API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Transaction committed but failed ledger-side validation
    #[error("Transaction {hash} rejected: {vm_status}")]
    Rejected { hash: String, vm_status: String },
    #[error("Decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Failures of the external signing capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("User rejected the request")]
    UserRejected,
    #[error("Signer unavailable: {0}")]
    Unavailable(String),
}
