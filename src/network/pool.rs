// src/network/pool.rs
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{FarmError, FarmResult};
use crate::network::client::{AlloyChainClient, ChainClient};
use crate::network::NetworkId;

/// One connected network, owned by the pool for the duration of a run
#[derive(Clone)]
pub struct ProviderHandle {
    pub network: NetworkId,
    pub client: Arc<dyn ChainClient>,
    /// Multi-wallet queries against this network may go out concurrently
    pub batching: bool,
}

/// Connected clients for the networks selected for a run.
///
/// Connection failures are not fatal: the network is simply absent from the
/// pool, and the failure is handed back so the caller can report it.
pub struct ProviderPool {
    handles: HashMap<NetworkId, ProviderHandle>,
}

impl ProviderPool {
    /// Connect to every requested network, skipping the unreachable ones
    pub async fn connect(networks: &[NetworkId]) -> (Self, Vec<(NetworkId, FarmError)>) {
        let mut handles = HashMap::new();
        let mut skipped = Vec::new();

        for &network in networks {
            match Self::open(network).await {
                Ok(handle) => {
                    handles.insert(network, handle);
                }
                Err(err) => {
                    tracing::warn!(network = %network, error = %err, "provider connection failed");
                    skipped.push((network, err));
                }
            }
        }

        (Self { handles }, skipped)
    }

    async fn open(network: NetworkId) -> FarmResult<ProviderHandle> {
        let client = AlloyChainClient::connect(network).await?;

        // Liveness check; a wrong chain id means a misconfigured endpoint.
        let reported = client.chain_id().await?;
        let expected = network.chain_id();
        if reported != expected {
            return Err(FarmError::Connectivity {
                network,
                reason: format!("chain id mismatch: endpoint reports {reported}, expected {expected}"),
            });
        }

        Ok(ProviderHandle {
            network,
            client: Arc::new(client),
            batching: network.batching_supported(),
        })
    }

    pub fn get(&self, network: NetworkId) -> Option<&ProviderHandle> {
        self.handles.get(&network)
    }

    pub fn handles(&self) -> impl Iterator<Item = &ProviderHandle> {
        self.handles.values()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_handles(handles: Vec<ProviderHandle>) -> Self {
        Self {
            handles: handles.into_iter().map(|h| (h.network, h)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test::MockChainClient;

    #[test]
    fn test_pool_lookup() {
        let base = MockChainClient::new(NetworkId::Base.chain_id());
        let pool = ProviderPool::from_handles(vec![ProviderHandle {
            network: NetworkId::Base,
            client: base,
            batching: true,
        }]);

        assert_eq!(pool.len(), 1);
        assert!(!pool.is_empty());
        assert!(pool.get(NetworkId::Base).is_some());
        assert!(pool.get(NetworkId::Lisk).is_none());
    }
}
