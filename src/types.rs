// src/types.rs
use std::collections::HashMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::network::NetworkId;

/// Terminal counters of one (network, wallet) job, written exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub network: NetworkId,
    pub wallet_ordinal: u32,
    pub wallet_address: Address,
    pub success: u32,
    pub fail: u32,
    pub duration_secs: u64,
}

/// Per-run report, keyed by `<NETWORK_KEY>-<wallet ordinal>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    results: HashMap<String, JobResult>,
}

impl Report {
    pub fn key(network: NetworkId, wallet_ordinal: u32) -> String {
        format!("{}-{}", network.key(), wallet_ordinal)
    }

    pub fn insert(&mut self, result: JobResult) {
        self.results
            .insert(Self::key(result.network, result.wallet_ordinal), result);
    }

    pub fn get(&self, network: NetworkId, wallet_ordinal: u32) -> Option<&JobResult> {
        self.results.get(&Self::key(network, wallet_ordinal))
    }

    pub fn entries(&self) -> impl Iterator<Item = &JobResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}

/// Run-level totals across every report entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub success: u64,
    pub fail: u64,
}

/// Live counters of an in-flight job, updated after each iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub network: NetworkId,
    pub wallet_ordinal: u32,
    pub completed: u32,
    pub success: u32,
    pub fail: u32,
    pub total: u32,
}

/// Snapshot answered to a status query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub running: bool,
    pub active: Vec<JobProgress>,
}

/// What gets persisted at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub settings: Settings,
    pub results: Report,
}
