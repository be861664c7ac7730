// src/error.rs
use thiserror::Error;

use crate::network::NetworkId;

#[derive(Error, Debug)]
pub enum FarmError {
    // Provider errors
    #[error("[{network}] connection failed: {reason}")]
    Connectivity { network: NetworkId, reason: String },

    #[error("RPC error: {0}")]
    Rpc(String),

    // Submission errors
    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    // Run lifecycle errors
    #[error("precondition failed: {0}")]
    Precondition(String),

    // Wallet errors
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    // Configuration errors
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    // Storage errors
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FarmError {
    /// Classify a submission failure from its error text.
    ///
    /// Nodes do not report nonce conflicts in a structured way, so this
    /// mirrors what the rest of the ecosystem does: a substring match on the
    /// message ("nonce too low", "invalid nonce", ...).
    pub fn classify_send(message: &str) -> Self {
        if message.to_ascii_lowercase().contains("nonce") {
            FarmError::NonceConflict(message.to_string())
        } else {
            FarmError::Transaction(message.to_string())
        }
    }

    /// Check if the error is worth another submission attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FarmError::NonceConflict(_) | FarmError::Transaction(_) | FarmError::Rpc(_)
        )
    }

    /// Get error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            FarmError::Connectivity { .. } | FarmError::Rpc(_) => "network",

            FarmError::NonceConflict(_) | FarmError::Transaction(_) => "submission",

            FarmError::Precondition(_) => "precondition",

            FarmError::InvalidKey(_) => "wallet",

            FarmError::InvalidConfiguration(_) => "configuration",

            FarmError::Storage(_) | FarmError::Serialization(_) | FarmError::Io(_) => "storage",
        }
    }
}

// Result type alias for convenience
pub type FarmResult<T> = Result<T, FarmError>;
