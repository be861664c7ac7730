// src/lib.rs
//! Multi-wallet transfer farming across EVM networks.
//!
//! A [`Dispatcher`] fans one transfer job out per (network, wallet) pair,
//! each job issuing a configured number of small randomized transfers with
//! local nonce tracking and bounded retries. Results land in a [`Report`]
//! that is persisted to disk after every run.

pub mod balance;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod network;
pub mod notify;
pub mod report;
pub mod types;
pub mod wallet;

pub use balance::BalanceRow;
pub use config::Settings;
pub use control::{Command, CommandResponse, ControlHandle, PendingPrompts, SettingField};
pub use dispatcher::{Dispatcher, RunState};
pub use error::{FarmError, FarmResult};
pub use network::{AlloyChainClient, ChainClient, NetworkId, ProviderPool, TRANSFER_GAS_LIMIT};
pub use notify::{ChannelNotifier, LogNotifier, Notifier, RunEvent};
pub use types::{JobProgress, JobResult, Report, RunStatus, RunTotals, SavedReport};
pub use wallet::{WalletIdentity, WalletSet};
