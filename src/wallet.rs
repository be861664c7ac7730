// src/wallet.rs
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::error::{FarmError, FarmResult};

/// One signer identity selected for a run.
///
/// `ordinal` is a stable 1-based index used for display and report keys.
#[derive(Debug, Clone)]
pub struct WalletIdentity {
    pub signer: PrivateKeySigner,
    pub address: Address,
    pub ordinal: u32,
}

impl WalletIdentity {
    /// `0x1234…abcd` form for notifications
    pub fn short_address(&self) -> String {
        let full = self.address.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

/// Immutable, already-resolved list of signers, ordinals assigned by position
#[derive(Debug, Clone, Default)]
pub struct WalletSet {
    wallets: Vec<WalletIdentity>,
}

impl WalletSet {
    pub fn from_keys(keys: &[String]) -> FarmResult<Self> {
        let mut wallets = Vec::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            let signer: PrivateKeySigner = key
                .parse()
                .map_err(|e| FarmError::InvalidKey(format!("key #{}: {e}", index + 1)))?;
            let address = signer.address();
            wallets.push(WalletIdentity {
                signer,
                address,
                ordinal: index as u32 + 1,
            });
        }
        Ok(Self { wallets })
    }

    /// Load signer keys from the environment: `PRIVATE_KEY`, then
    /// `PRIVATE_KEY_1` through `PRIVATE_KEY_10`
    pub fn from_env() -> FarmResult<Self> {
        let mut keys = Vec::new();

        if let Ok(key) = std::env::var("PRIVATE_KEY") {
            keys.push(key);
        }
        for i in 1..=10 {
            if let Ok(key) = std::env::var(format!("PRIVATE_KEY_{i}")) {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Err(FarmError::InvalidConfiguration(
                "no private keys configured".to_string(),
            ));
        }
        Self::from_keys(&keys)
    }

    pub fn wallets(&self) -> &[WalletIdentity] {
        &self.wallets
    }

    pub fn get(&self, ordinal: u32) -> Option<&WalletIdentity> {
        self.wallets.iter().find(|w| w.ordinal == ordinal)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}
