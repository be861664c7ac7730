// src/config.rs
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FarmError, FarmResult};

/// Run configuration, valid for a whole run once handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Transfers per (network, wallet) pair
    pub transaction_count: u32,
    /// Amount range in the network's native unit (ETH)
    pub min_amount: f64,
    pub max_amount: f64,
    /// Pacing range between transfers, in seconds
    pub min_delay: u64,
    pub max_delay: u64,
    /// Submission attempts per transfer
    pub max_retries: u32,
    /// Base backoff between failed attempts, in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transaction_count: 250,
            min_amount: 0.000000001,
            max_amount: 0.000000005,
            min_delay: 15,
            max_delay: 30,
            max_retries: 3,
            retry_delay_ms: 5000,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> FarmResult<()> {
        if self.transaction_count == 0 || self.transaction_count > 1000 {
            return Err(FarmError::InvalidConfiguration(
                "transaction count must be between 1 and 1000".to_string(),
            ));
        }
        if self.min_amount <= 0.0 || self.max_amount < self.min_amount {
            return Err(FarmError::InvalidConfiguration(
                "amount range must be positive with min <= max".to_string(),
            ));
        }
        if self.min_delay == 0 || self.max_delay < self.min_delay {
            return Err(FarmError::InvalidConfiguration(
                "delay range must be at least 1 second with min <= max".to_string(),
            ));
        }
        if self.max_retries == 0 || self.max_retries > 10 {
            return Err(FarmError::InvalidConfiguration(
                "retry count must be between 1 and 10".to_string(),
            ));
        }
        Ok(())
    }

    /// Load saved settings, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "could not parse saved settings, using defaults");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    pub fn save(&self, path: &Path) -> FarmResult<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .map_err(|e| FarmError::Storage(format!("{}: {e}", path.display())))
    }
}
