// src/network/client.rs
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, B256, TxKind, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

use crate::error::{FarmError, FarmResult};
use crate::network::NetworkId;

/// Plain value moves never need more gas than this
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// One live connection to a network.
///
/// Everything above this trait is transport agnostic, which also keeps the
/// dispatcher and jobs testable against an in-memory client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain id reported by the endpoint (liveness check)
    async fn chain_id(&self) -> FarmResult<u64>;

    /// Current gas price quote, queried fresh per submission attempt
    async fn gas_price(&self) -> FarmResult<u128>;

    /// Pending transaction count for a signer (authoritative nonce source)
    async fn pending_nonce(&self, address: Address) -> FarmResult<u64>;

    /// Native balance of an address
    async fn balance(&self, address: Address) -> FarmResult<U256>;

    /// Sign and submit one value transfer, returning the transaction hash.
    ///
    /// Does not wait for inclusion; acceptance by the node counts as a
    /// confirmed submission.
    async fn send_transfer(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        value: U256,
        gas_price: u128,
        nonce: u64,
    ) -> FarmResult<B256>;
}

/// HTTP JSON-RPC implementation over alloy
pub struct AlloyChainClient {
    network: NetworkId,
    provider: DynProvider,
}

impl AlloyChainClient {
    /// Connect to the network's configured endpoint
    pub async fn connect(network: NetworkId) -> FarmResult<Self> {
        let endpoint = network.endpoint();
        let provider = ProviderBuilder::new()
            .connect(&endpoint)
            .await
            .map_err(|e| FarmError::Connectivity {
                network,
                reason: format!("{endpoint}: {e}"),
            })?;

        Ok(Self {
            network,
            provider: provider.erased(),
        })
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn chain_id(&self) -> FarmResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| FarmError::Connectivity {
                network: self.network,
                reason: e.to_string(),
            })
    }

    async fn gas_price(&self) -> FarmResult<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| FarmError::Rpc(e.to_string()))
    }

    async fn pending_nonce(&self, address: Address) -> FarmResult<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| FarmError::Rpc(e.to_string()))
    }

    async fn balance(&self, address: Address) -> FarmResult<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| FarmError::Rpc(e.to_string()))
    }

    async fn send_transfer(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        value: U256,
        gas_price: u128,
        nonce: u64,
    ) -> FarmResult<B256> {
        let mut tx = TxLegacy {
            chain_id: Some(self.network.chain_id()),
            nonce,
            gas_price,
            gas_limit: TRANSFER_GAS_LIMIT,
            to: TxKind::Call(to),
            value,
            input: Default::default(),
        };

        let signature = signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| FarmError::Transaction(e.to_string()))?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));

        let pending = self
            .provider
            .send_raw_transaction(&envelope.encoded_2718())
            .await
            .map_err(|e| FarmError::classify_send(&e.to_string()))?;

        Ok(*pending.tx_hash())
    }
}
