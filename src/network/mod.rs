// src/network/mod.rs
pub mod client;
pub mod pool;


pub use client::{AlloyChainClient, ChainClient, TRANSFER_GAS_LIMIT};
pub use pool::{ProviderHandle, ProviderPool};

use serde::{Deserialize, Serialize};

/// Supported networks.
///
/// Keyed catalog instead of free-form records: every network the farm can
/// drive is listed here, and everything else (endpoints, chain ids, batching
/// behavior) is derived from its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkId {
    #[serde(rename = "SONEIUM")]
    Soneium,
    #[serde(rename = "OP")]
    Optimism,
    #[serde(rename = "INK")]
    Ink,
    #[serde(rename = "LISK")]
    Lisk,
    #[serde(rename = "BASE")]
    Base,
    #[serde(rename = "UNICHAIN")]
    Unichain,
    #[serde(rename = "MODE")]
    Mode,
    #[serde(rename = "WORLDCHAIN")]
    WorldChain,
}

/// Static metadata for one supported network
#[derive(Debug, Clone)]
pub struct NetworkDescriptor {
    pub id: NetworkId,
    /// Stable key, also the prefix of the `<KEY>_RPC` endpoint override
    pub key: &'static str,
    pub name: &'static str,
    pub chain_id: u64,
    pub default_endpoint: &'static str,
    /// Whether the network's RPC endpoint tolerates batched calls
    pub batching_supported: bool,
}

// Order must match the NetworkId discriminants.
static NETWORKS: [NetworkDescriptor; 8] = [
    NetworkDescriptor {
        id: NetworkId::Soneium,
        key: "SONEIUM",
        name: "Soneium",
        chain_id: 1868,
        default_endpoint: "https://rpc.soneium.org",
        batching_supported: false,
    },
    NetworkDescriptor {
        id: NetworkId::Optimism,
        key: "OP",
        name: "Optimism",
        chain_id: 10,
        default_endpoint: "https://1rpc.io/op",
        batching_supported: true,
    },
    NetworkDescriptor {
        id: NetworkId::Ink,
        key: "INK",
        name: "Ink",
        chain_id: 57073,
        default_endpoint: "https://rpc-gel.inkonchain.com",
        batching_supported: false,
    },
    NetworkDescriptor {
        id: NetworkId::Lisk,
        key: "LISK",
        name: "Lisk",
        chain_id: 1135,
        default_endpoint: "https://rpc.api.lisk.com",
        batching_supported: false,
    },
    NetworkDescriptor {
        id: NetworkId::Base,
        key: "BASE",
        name: "Base",
        chain_id: 8453,
        default_endpoint: "https://mainnet.base.org",
        batching_supported: true,
    },
    NetworkDescriptor {
        id: NetworkId::Unichain,
        key: "UNICHAIN",
        name: "UniChain",
        chain_id: 130,
        default_endpoint: "https://mainnet.unichain.org",
        batching_supported: false,
    },
    NetworkDescriptor {
        id: NetworkId::Mode,
        key: "MODE",
        name: "Mode",
        chain_id: 34443,
        default_endpoint: "https://mode.drpc.org",
        batching_supported: false,
    },
    NetworkDescriptor {
        id: NetworkId::WorldChain,
        key: "WORLDCHAIN",
        name: "World Chain",
        chain_id: 480,
        default_endpoint: "https://worldchain.drpc.org",
        batching_supported: false,
    },
];

impl NetworkId {
    /// All supported networks, in catalog order
    pub fn all() -> &'static [NetworkId] {
        const ALL: [NetworkId; 8] = [
            NetworkId::Soneium,
            NetworkId::Optimism,
            NetworkId::Ink,
            NetworkId::Lisk,
            NetworkId::Base,
            NetworkId::Unichain,
            NetworkId::Mode,
            NetworkId::WorldChain,
        ];
        &ALL
    }

    pub fn descriptor(&self) -> &'static NetworkDescriptor {
        &NETWORKS[*self as usize]
    }

    pub fn key(&self) -> &'static str {
        self.descriptor().key
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn chain_id(&self) -> u64 {
        self.descriptor().chain_id
    }

    pub fn batching_supported(&self) -> bool {
        self.descriptor().batching_supported
    }

    /// Connection endpoint: `<KEY>_RPC` environment override, or the default
    pub fn endpoint(&self) -> String {
        std::env::var(format!("{}_RPC", self.key()))
            .unwrap_or_else(|_| self.descriptor().default_endpoint.to_string())
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_integrity() {
        assert_eq!(NetworkId::all().len(), NETWORKS.len());

        let mut chain_ids = HashSet::new();
        let mut keys = HashSet::new();
        for network in NetworkId::all() {
            // descriptor lookup must agree with the enum discriminant
            assert_eq!(network.descriptor().id, *network);
            assert!(chain_ids.insert(network.chain_id()));
            assert!(keys.insert(network.key()));
            assert!(network.descriptor().default_endpoint.starts_with("https://"));
        }
    }

    #[test]
    fn test_known_chain_ids() {
        assert_eq!(NetworkId::Optimism.chain_id(), 10);
        assert_eq!(NetworkId::Base.chain_id(), 8453);
        assert_eq!(NetworkId::WorldChain.chain_id(), 480);
        assert!(NetworkId::Base.batching_supported());
        assert!(!NetworkId::Lisk.batching_supported());
    }

    #[test]
    fn test_endpoint_env_override() {
        assert_eq!(NetworkId::Lisk.endpoint(), "https://rpc.api.lisk.com");

        unsafe { std::env::set_var("LISK_RPC", "http://localhost:8545") };
        assert_eq!(NetworkId::Lisk.endpoint(), "http://localhost:8545");
        unsafe { std::env::remove_var("LISK_RPC") };
    }

    #[test]
    fn test_serde_keys() {
        assert_eq!(serde_json::to_string(&NetworkId::Optimism).unwrap(), "\"OP\"");
        let parsed: NetworkId = serde_json::from_str("\"WORLDCHAIN\"").unwrap();
        assert_eq!(parsed, NetworkId::WorldChain);
    }
}
