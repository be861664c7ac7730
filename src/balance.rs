// src/balance.rs
use alloy::primitives::{Address, U256, utils::format_ether};
use futures::future::join_all;

use crate::network::{NetworkId, ProviderHandle, ProviderPool};
use crate::wallet::WalletIdentity;

/// One cell of the balance sheet. `balance` is `None` when the query
/// failed for that wallet on that network.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub network: NetworkId,
    pub wallet_ordinal: u32,
    pub wallet_address: Address,
    pub balance: Option<U256>,
}

async fn query_one(
    handle: &ProviderHandle,
    wallet: &WalletIdentity,
) -> BalanceRow {
    let balance = match handle.client.balance(wallet.address).await {
        Ok(balance) => Some(balance),
        Err(err) => {
            tracing::warn!(
                network = %handle.network,
                wallet = wallet.ordinal,
                error = %err,
                "balance query failed"
            );
            None
        }
    };
    BalanceRow {
        network: handle.network,
        wallet_ordinal: wallet.ordinal,
        wallet_address: wallet.address,
        balance,
    }
}

/// Query every wallet's balance on every connected network.
///
/// Networks that support concurrent querying get all wallet lookups in
/// flight at once; the rest are walked one wallet at a time. A failed
/// query yields a `None` cell, never an error for the whole sheet.
pub async fn fetch_balances(
    pool: &ProviderPool,
    wallets: &[WalletIdentity],
) -> Vec<BalanceRow> {
    let mut rows = Vec::with_capacity(pool.len() * wallets.len());

    for handle in pool.handles() {
        if handle.batching {
            let queries = wallets.iter().map(|wallet| query_one(handle, wallet));
            rows.extend(join_all(queries).await);
        } else {
            for wallet in wallets {
                rows.push(query_one(handle, wallet).await);
            }
        }
    }

    rows.sort_by_key(|row| (row.wallet_ordinal, row.network.key()));
    rows
}

/// Balance sheet grouped by wallet, amounts in ether.
pub fn render(rows: &[BalanceRow]) -> String {
    if rows.is_empty() {
        return "No balances to show.".to_string();
    }

    let mut out = String::from("Wallet balances\n");
    let mut current: Option<u32> = None;
    for row in rows {
        if current != Some(row.wallet_ordinal) {
            current = Some(row.wallet_ordinal);
            out.push_str(&format!(
                "\nWallet #{} ({})\n",
                row.wallet_ordinal, row.wallet_address
            ));
        }
        match row.balance {
            Some(balance) => out.push_str(&format!(
                "  {:<12} {} ETH\n",
                row.network.name(),
                format_ether(balance)
            )),
            None => out.push_str(&format!("  {:<12} unavailable\n", row.network.name())),
        }
    }
    out
}
