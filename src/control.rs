// src/control.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use crate::balance::{self, BalanceRow};
use crate::config::Settings;
use crate::dispatcher::Dispatcher;
use crate::error::{FarmError, FarmResult};
use crate::network::{NetworkId, ProviderPool};
use crate::types::{Report, RunStatus};
use crate::wallet::WalletIdentity;

/// Operations a front end can ask of the dispatcher.
#[derive(Debug, Clone)]
pub enum Command {
    Start {
        networks: Vec<NetworkId>,
        wallets: Vec<WalletIdentity>,
    },
    Stop,
    Status,
    Balances {
        networks: Vec<NetworkId>,
        wallets: Vec<WalletIdentity>,
    },
    LastReport,
}

#[derive(Debug)]
pub enum CommandResponse {
    RunCompleted(Report),
    StopRequested,
    Status(RunStatus),
    Balances(Vec<BalanceRow>),
    Report(Report),
}

/// Thin command layer over a shared dispatcher. Front ends (a CLI loop, a
/// chat bot) translate user input into `Command`s and format the response.
pub struct ControlHandle {
    dispatcher: Arc<Dispatcher>,
}

impl ControlHandle {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub async fn handle(&self, command: Command) -> FarmResult<CommandResponse> {
        match command {
            Command::Start { networks, wallets } => {
                let report = self.dispatcher.run(&networks, &wallets).await?;
                Ok(CommandResponse::RunCompleted(report))
            }
            Command::Stop => {
                self.dispatcher.request_stop()?;
                Ok(CommandResponse::StopRequested)
            }
            Command::Status => Ok(CommandResponse::Status(self.dispatcher.status().await)),
            Command::Balances { networks, wallets } => {
                let (pool, skipped) = ProviderPool::connect(&networks).await;
                for (network, err) in skipped {
                    tracing::warn!(network = %network, error = %err, "network skipped");
                }
                Ok(CommandResponse::Balances(
                    balance::fetch_balances(&pool, &wallets).await,
                ))
            }
            Command::LastReport => {
                let report = self.dispatcher.last_report().await;
                if report.is_empty() {
                    return Err(FarmError::Precondition(
                        "no report available yet".to_string(),
                    ));
                }
                Ok(CommandResponse::Report(report))
            }
        }
    }
}

/// One outstanding text prompt per session. A newer prompt for the same
/// session silently replaces the stale one.
#[derive(Default)]
pub struct PendingPrompts {
    waiting: Mutex<HashMap<i64, oneshot::Sender<String>>>,
}

impl PendingPrompts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the session's next free-form message.
    pub async fn expect(&self, session: i64) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().await.insert(session, tx);
        rx
    }

    /// Route a message to whoever is waiting on this session. Returns
    /// false when nothing was pending (the caller treats the message as
    /// ordinary input).
    pub async fn fulfill(&self, session: i64, text: String) -> bool {
        match self.waiting.lock().await.remove(&session) {
            Some(tx) => tx.send(text).is_ok(),
            None => false,
        }
    }
}

/// Which settings knob a free-form answer is meant to adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    TransactionCount,
    Amount,
    Delay,
    Retries,
}

fn parse_range<T: std::str::FromStr>(input: &str, what: &str) -> FarmResult<(T, T)> {
    let (lo, hi) = input
        .split_once('-')
        .ok_or_else(|| FarmError::InvalidConfiguration(format!("{what} must be MIN-MAX")))?;
    let lo = lo
        .trim()
        .parse::<T>()
        .map_err(|_| FarmError::InvalidConfiguration(format!("invalid {what}: {input}")))?;
    let hi = hi
        .trim()
        .parse::<T>()
        .map_err(|_| FarmError::InvalidConfiguration(format!("invalid {what}: {input}")))?;
    Ok((lo, hi))
}

/// Apply one user-supplied value to the settings. Scalar fields take a
/// bare number ("100"); ranged fields take "MIN-MAX" ("0.1-0.5", "10-25").
/// The settings are untouched when parsing or validation fails.
pub fn apply_setting(
    settings: &mut Settings,
    field: SettingField,
    input: &str,
) -> FarmResult<()> {
    let mut candidate = settings.clone();
    let input = input.trim();

    match field {
        SettingField::TransactionCount => {
            candidate.transaction_count = input.parse().map_err(|_| {
                FarmError::InvalidConfiguration(format!("invalid transaction count: {input}"))
            })?;
        }
        SettingField::Amount => {
            let (min, max) = parse_range::<f64>(input, "amount range")?;
            candidate.min_amount = min;
            candidate.max_amount = max;
        }
        SettingField::Delay => {
            let (min, max) = parse_range::<u64>(input, "delay range")?;
            candidate.min_delay = min;
            candidate.max_delay = max;
        }
        SettingField::Retries => {
            candidate.max_retries = input.parse().map_err(|_| {
                FarmError::InvalidConfiguration(format!("invalid retry count: {input}"))
            })?;
        }
    }

    candidate.validate()?;
    *settings = candidate;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChannelNotifier;

    fn handle() -> ControlHandle {
        let (notifier, _rx) = ChannelNotifier::new();
        ControlHandle::new(Arc::new(Dispatcher::new(Settings::default(), notifier)))
    }

    #[tokio::test]
    async fn test_stop_without_run_is_rejected() {
        let err = handle().handle(Command::Stop).await.unwrap_err();
        assert!(matches!(err, FarmError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_status_when_idle() {
        match handle().handle(Command::Status).await.unwrap() {
            CommandResponse::Status(status) => {
                assert!(!status.running);
                assert!(status.active.is_empty());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_last_report_before_any_run() {
        let err = handle().handle(Command::LastReport).await.unwrap_err();
        assert!(matches!(err, FarmError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_prompt_round_trip() {
        let prompts = PendingPrompts::new();
        let rx = prompts.expect(42).await;

        assert!(prompts.fulfill(42, "0.1-0.5".to_string()).await);
        assert_eq!(rx.await.unwrap(), "0.1-0.5");
    }

    #[tokio::test]
    async fn test_fulfill_unknown_session() {
        let prompts = PendingPrompts::new();
        assert!(!prompts.fulfill(7, "hello".to_string()).await);
    }

    #[tokio::test]
    async fn test_newer_prompt_replaces_stale_one() {
        let prompts = PendingPrompts::new();
        let stale = prompts.expect(1).await;
        let fresh = prompts.expect(1).await;

        assert!(prompts.fulfill(1, "250".to_string()).await);
        assert_eq!(fresh.await.unwrap(), "250");
        assert!(stale.await.is_err());
    }

    #[test]
    fn test_apply_transaction_count() {
        let mut settings = Settings::default();
        apply_setting(&mut settings, SettingField::TransactionCount, "100").unwrap();
        assert_eq!(settings.transaction_count, 100);
    }

    #[test]
    fn test_apply_amount_range() {
        let mut settings = Settings::default();
        apply_setting(&mut settings, SettingField::Amount, "0.1-0.5").unwrap();
        assert_eq!(settings.min_amount, 0.1);
        assert_eq!(settings.max_amount, 0.5);
    }

    #[test]
    fn test_apply_delay_range() {
        let mut settings = Settings::default();
        apply_setting(&mut settings, SettingField::Delay, "10-25").unwrap();
        assert_eq!(settings.min_delay, 10);
        assert_eq!(settings.max_delay, 25);
    }

    #[test]
    fn test_apply_retries() {
        let mut settings = Settings::default();
        apply_setting(&mut settings, SettingField::Retries, "5").unwrap();
        assert_eq!(settings.max_retries, 5);
    }

    #[test]
    fn test_invalid_input_leaves_settings_untouched() {
        let mut settings = Settings::default();
        let before = settings.clone();

        assert!(apply_setting(&mut settings, SettingField::TransactionCount, "lots").is_err());
        assert!(apply_setting(&mut settings, SettingField::Amount, "0.5").is_err());
        assert!(apply_setting(&mut settings, SettingField::Amount, "0.5-0.1").is_err());
        assert!(apply_setting(&mut settings, SettingField::Delay, "0-10").is_err());
        assert!(apply_setting(&mut settings, SettingField::TransactionCount, "5000").is_err());
        assert!(apply_setting(&mut settings, SettingField::Retries, "0").is_err());

        assert_eq!(settings, before);
    }
}
