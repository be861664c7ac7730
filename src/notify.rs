// src/notify.rs
use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::network::NetworkId;

/// Human-readable run events, tagged with network and wallet ordinal
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        networks: usize,
        wallets: usize,
    },
    NetworkSkipped {
        network: NetworkId,
        reason: String,
    },
    TransferSent {
        network: NetworkId,
        wallet_ordinal: u32,
        index: u32,
        total: u32,
        to: Address,
        amount: String,
        tx_hash: B256,
    },
    TransferFailed {
        network: NetworkId,
        wallet_ordinal: u32,
        index: u32,
        total: u32,
        error: String,
    },
    Progress {
        network: NetworkId,
        wallet_ordinal: u32,
        completed: u32,
        total: u32,
        success: u32,
        fail: u32,
    },
    JobStopped {
        network: NetworkId,
        wallet_ordinal: u32,
        at: u32,
    },
    JobCompleted {
        network: NetworkId,
        wallet_ordinal: u32,
        success: u32,
        fail: u32,
        duration_secs: u64,
    },
    RunFinished {
        success: u64,
        fail: u64,
    },
}

/// Truncate for display, char-safe
fn shorten(s: &str, limit: usize) -> String {
    if s.chars().count() > limit {
        let cut: String = s.chars().take(limit).collect();
        format!("{cut}…")
    } else {
        s.to_string()
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::RunStarted { networks, wallets } => write!(
                f,
                "starting transfer run across {networks} network(s) with {wallets} wallet(s)"
            ),
            RunEvent::NetworkSkipped { network, reason } => {
                write!(f, "[{network}] connection failed, skipping: {reason}")
            }
            RunEvent::TransferSent {
                network,
                wallet_ordinal,
                index,
                total,
                to,
                amount,
                tx_hash,
            } => write!(
                f,
                "[{network}] [wallet #{wallet_ordinal}] [{index}/{total}] sent {amount} ETH to {} hash {}",
                shorten(&to.to_string(), 10),
                shorten(&tx_hash.to_string(), 20),
            ),
            RunEvent::TransferFailed {
                network,
                wallet_ordinal,
                index,
                total,
                error,
            } => write!(
                f,
                "[{network}] [wallet #{wallet_ordinal}] [{index}/{total}] failed: {}",
                shorten(error, 50),
            ),
            RunEvent::Progress {
                network,
                wallet_ordinal,
                completed,
                total,
                success,
                fail,
            } => write!(
                f,
                "[{network}] [wallet #{wallet_ordinal}] progress {completed}/{total} (ok {success} | failed {fail})"
            ),
            RunEvent::JobStopped {
                network,
                wallet_ordinal,
                at,
            } => write!(
                f,
                "[{network}] [wallet #{wallet_ordinal}] stopped at transfer {at}"
            ),
            RunEvent::JobCompleted {
                network,
                wallet_ordinal,
                success,
                fail,
                duration_secs,
            } => write!(
                f,
                "[{network}] [wallet #{wallet_ordinal}] finished: ok {success} | failed {fail} | {duration_secs}s"
            ),
            RunEvent::RunFinished { success, fail } => {
                write!(f, "transfer run complete: ok {success} | failed {fail}")
            }
        }
    }
}

/// Sink for run events.
///
/// Implementations must never fail the run; delivery problems are theirs to
/// swallow or log.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: RunEvent);
}

/// Notifier that writes every event through `tracing`
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: RunEvent) {
        match &event {
            RunEvent::TransferFailed { .. } | RunEvent::NetworkSkipped { .. } => {
                tracing::warn!("{event}")
            }
            _ => tracing::info!("{event}"),
        }
    }
}

/// Notifier that forwards events over a channel, for an external consumer
/// (chat frontend, test harness)
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, event: RunEvent) {
        // Receiver gone means nobody is listening anymore; drop the event.
        let _ = self.tx.send(event);
    }
}
