// src/dispatcher/job.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::U256;
use alloy::primitives::utils::parse_ether;
use alloy::signers::local::PrivateKeySigner;
use rand::Rng;
use tokio::time::sleep;

use crate::config::Settings;
use crate::dispatcher::RunState;
use crate::error::{FarmError, FarmResult};
use crate::network::{ChainClient, NetworkId};
use crate::notify::{Notifier, RunEvent};
use crate::types::{JobProgress, JobResult};
use crate::wallet::WalletIdentity;

/// Draw a transfer amount uniformly from `[min, max]` ETH.
///
/// Precision is capped at 12 fractional digits before conversion to wei.
pub(crate) fn draw_amount(min: f64, max: f64) -> FarmResult<U256> {
    let amount = rand::thread_rng().gen_range(min..=max);
    parse_ether(&format!("{amount:.12}"))
        .map_err(|e| FarmError::Transaction(format!("bad transfer amount {amount}: {e}")))
}

/// Draw a pacing delay uniformly from `[min, max]` seconds, in milliseconds
pub(crate) fn draw_delay_ms(min_secs: u64, max_secs: u64) -> u64 {
    rand::thread_rng().gen_range(min_secs * 1000..=max_secs * 1000)
}

/// One (network, wallet) pair driving a bounded sequence of transfers.
///
/// The job owns its counters and nonce cursor exclusively; the only shared
/// state it touches is the stop flag, its progress entry, and the final
/// report write.
pub(crate) struct TransferJob {
    network: NetworkId,
    wallet: WalletIdentity,
    client: Arc<dyn ChainClient>,
    settings: Settings,
    state: Arc<RunState>,
    notifier: Arc<dyn Notifier>,
}

impl TransferJob {
    pub(crate) fn new(
        network: NetworkId,
        wallet: WalletIdentity,
        client: Arc<dyn ChainClient>,
        settings: Settings,
        state: Arc<RunState>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            network,
            wallet,
            client,
            settings,
            state,
            notifier,
        }
    }

    pub(crate) async fn run(self) {
        let started = Instant::now();
        let total = self.settings.transaction_count;

        self.state
            .insert_active(JobProgress {
                network: self.network,
                wallet_ordinal: self.wallet.ordinal,
                completed: 0,
                success: 0,
                fail: 0,
                total,
            })
            .await;

        let mut success: u32 = 0;
        let mut fail: u32 = 0;
        let mut completed: u32 = 0;

        // The cursor starts at the network's pending count and from there is
        // advanced locally, exactly once per confirmed submission.
        match self.client.pending_nonce(self.wallet.address).await {
            Ok(mut nonce) => {
                for i in 0..total {
                    if self.state.stop_requested() {
                        self.notifier
                            .notify(RunEvent::JobStopped {
                                network: self.network,
                                wallet_ordinal: self.wallet.ordinal,
                                at: i + 1,
                            })
                            .await;
                        break;
                    }

                    let sent = self.run_attempts(i, &mut nonce).await;
                    if sent {
                        success += 1;
                    } else {
                        fail += 1;
                    }
                    completed += 1;

                    self.state
                        .update_progress(self.network, self.wallet.ordinal, completed, success, fail)
                        .await;

                    if completed % 10 == 0 {
                        self.notifier
                            .notify(RunEvent::Progress {
                                network: self.network,
                                wallet_ordinal: self.wallet.ordinal,
                                completed,
                                total,
                                success,
                                fail,
                            })
                            .await;
                    }

                    // Pacing applies after every attempted transfer,
                    // success or failure.
                    let pause = draw_delay_ms(self.settings.min_delay, self.settings.max_delay);
                    sleep(Duration::from_millis(pause)).await;
                }
            }
            Err(err) => {
                tracing::error!(
                    network = %self.network,
                    wallet = self.wallet.ordinal,
                    error = %err,
                    "could not fetch starting nonce",
                );
                self.notifier
                    .notify(RunEvent::TransferFailed {
                        network: self.network,
                        wallet_ordinal: self.wallet.ordinal,
                        index: 1,
                        total,
                        error: err.to_string(),
                    })
                    .await;
            }
        }

        let duration_secs = started.elapsed().as_secs();
        self.state
            .finish_job(JobResult {
                network: self.network,
                wallet_ordinal: self.wallet.ordinal,
                wallet_address: self.wallet.address,
                success,
                fail,
                duration_secs,
            })
            .await;

        self.notifier
            .notify(RunEvent::JobCompleted {
                network: self.network,
                wallet_ordinal: self.wallet.ordinal,
                success,
                fail,
                duration_secs,
            })
            .await;
    }

    /// One iteration's retry loop. Returns whether a submission went through.
    ///
    /// The nonce cursor is reused as-is across failed attempts, on the
    /// assumption that a rejected submission never reached the network. A
    /// rejection that was in fact accepted will surface as a nonce conflict
    /// on the next attempt, at which point the cursor is resynchronized from
    /// the pending count.
    async fn run_attempts(&self, index: u32, nonce: &mut u64) -> bool {
        let total = self.settings.transaction_count;

        // Throwaway destination; the value is intentionally abandoned.
        let to = PrivateKeySigner::random().address();

        // One amount per transfer, reused across its attempts.
        let value = match draw_amount(self.settings.min_amount, self.settings.max_amount) {
            Ok(value) => value,
            Err(err) => {
                self.notifier
                    .notify(RunEvent::TransferFailed {
                        network: self.network,
                        wallet_ordinal: self.wallet.ordinal,
                        index: index + 1,
                        total,
                        error: err.to_string(),
                    })
                    .await;
                return false;
            }
        };

        for attempt in 1..=self.settings.max_retries {
            match self.attempt_send(to, value, *nonce).await {
                Ok(tx_hash) => {
                    *nonce += 1;
                    self.notifier
                        .notify(RunEvent::TransferSent {
                            network: self.network,
                            wallet_ordinal: self.wallet.ordinal,
                            index: index + 1,
                            total,
                            to,
                            amount: alloy::primitives::utils::format_ether(value),
                            tx_hash,
                        })
                        .await;
                    return true;
                }
                Err(err) => {
                    if matches!(err, FarmError::NonceConflict(_)) {
                        if let Ok(pending) = self.client.pending_nonce(self.wallet.address).await {
                            *nonce = pending;
                        }
                    }

                    if attempt == self.settings.max_retries {
                        self.notifier
                            .notify(RunEvent::TransferFailed {
                                network: self.network,
                                wallet_ordinal: self.wallet.ordinal,
                                index: index + 1,
                                total,
                                error: err.to_string(),
                            })
                            .await;
                    } else if self.settings.retry_delay_ms > 0 {
                        sleep(Duration::from_millis(
                            self.settings.retry_delay_ms * attempt as u64,
                        ))
                        .await;
                    }
                }
            }
        }

        false
    }

    async fn attempt_send(
        &self,
        to: alloy::primitives::Address,
        value: U256,
        nonce: u64,
    ) -> FarmResult<alloy::primitives::B256> {
        // Fee rate is quoted fresh for every attempt.
        let gas_price = self.client.gas_price().await?;
        self.client
            .send_transfer(&self.wallet.signer, to, value, gas_price, nonce)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test::{MockChainClient, SendOutcome};
    use crate::notify::ChannelNotifier;
    use crate::types::Report;
    use crate::wallet::WalletSet;

    fn fast_settings(transaction_count: u32) -> Settings {
        Settings {
            transaction_count,
            min_amount: 0.000000001,
            max_amount: 0.000000005,
            min_delay: 0,
            max_delay: 0,
            max_retries: 3,
            retry_delay_ms: 0,
        }
    }

    fn test_wallet() -> WalletIdentity {
        WalletSet::from_keys(&[
            "0x0000000000000000000000000000000000000000000000000000000000000001".to_string(),
        ])
        .unwrap()
        .wallets()[0]
            .clone()
    }

    async fn run_job(
        client: Arc<MockChainClient>,
        settings: Settings,
    ) -> (Arc<RunState>, Vec<RunEvent>) {
        let state = Arc::new(RunState::new());
        let (notifier, mut rx) = ChannelNotifier::new();

        let job = TransferJob::new(
            NetworkId::Base,
            test_wallet(),
            client,
            settings,
            Arc::clone(&state),
            notifier,
        );
        job.run().await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (state, events)
    }

    fn report_entry(report: &Report) -> &crate::types::JobResult {
        report.get(NetworkId::Base, 1).expect("terminal report entry")
    }

    #[tokio::test]
    async fn test_all_submissions_succeed() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        let (state, events) = run_job(Arc::clone(&client), fast_settings(5)).await;

        let report = state.report_snapshot().await;
        let entry = report_entry(&report);
        assert_eq!(entry.success, 5);
        assert_eq!(entry.fail, 0);
        assert_eq!(entry.success + entry.fail, 5);

        // Nonce advanced by exactly 1 per confirmed send, in order.
        let nonces: Vec<u64> = client.sent().iter().map(|t| t.nonce).collect();
        assert_eq!(nonces, vec![0, 1, 2, 3, 4]);

        // Job is gone from the active set and announced its completion.
        assert!(state.active_snapshot().await.is_empty());
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::JobCompleted { success: 5, fail: 0, .. })));
    }

    #[tokio::test]
    async fn test_every_attempt_fails() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        client.script(vec![
            SendOutcome::Fail("insufficient funds"),
            SendOutcome::Fail("insufficient funds"),
            SendOutcome::Fail("insufficient funds"),
            SendOutcome::Fail("insufficient funds"),
            SendOutcome::Fail("insufficient funds"),
            SendOutcome::Fail("insufficient funds"),
        ]);

        let (state, events) = run_job(Arc::clone(&client), fast_settings(2)).await;

        let report = state.report_snapshot().await;
        let entry = report_entry(&report);
        assert_eq!(entry.success, 0);
        assert_eq!(entry.fail, 2);

        // Each iteration consumed the full attempt budget.
        assert_eq!(client.send_attempts(), 6);
        // Nothing was ever accepted, so the nonce never moved.
        assert!(client.sent().is_empty());
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, RunEvent::TransferFailed { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_nonce_conflict_resynchronizes_cursor() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        client.set_network_nonce(5);
        client.script(vec![SendOutcome::FailNonce { pending: 9 }]);

        let (state, _) = run_job(Arc::clone(&client), fast_settings(1)).await;

        let report = state.report_snapshot().await;
        let entry = report_entry(&report);
        assert_eq!(entry.success, 1);
        assert_eq!(entry.fail, 0);

        // First attempt went out with the stale cursor, the retry with the
        // resynchronized one.
        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].nonce, 9);
        assert_eq!(client.send_attempts(), 2);
    }

    #[tokio::test]
    async fn test_amounts_and_gas_limit_of_sent_transfers() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        let (_, _) = run_job(Arc::clone(&client), fast_settings(8)).await;

        let min_wei = parse_ether("0.000000001").unwrap();
        let max_wei = parse_ether("0.000000005").unwrap();
        for transfer in client.sent() {
            assert!(transfer.value >= min_wei && transfer.value <= max_wei);
            assert_eq!(transfer.gas_price, 1_000_000_000);
        }
    }

    #[tokio::test]
    async fn test_stop_flag_preempts_first_iteration() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        let state = Arc::new(RunState::new());
        state.request_stop();
        let (notifier, mut rx) = ChannelNotifier::new();

        TransferJob::new(
            NetworkId::Base,
            test_wallet(),
            Arc::clone(&client) as Arc<dyn ChainClient>,
            fast_settings(100),
            Arc::clone(&state),
            notifier,
        )
        .run()
        .await;

        // No transfer was attempted, but the job still reported terminally.
        assert!(client.sent().is_empty());
        let report = state.report_snapshot().await;
        let entry = report_entry(&report);
        assert_eq!(entry.success + entry.fail, 0);

        let mut saw_stop = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RunEvent::JobStopped { at: 1, .. }) {
                saw_stop = true;
            }
        }
        assert!(saw_stop);
    }

    #[tokio::test]
    async fn test_stop_mid_run_preserves_counters() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        let state = Arc::new(RunState::new());
        let (notifier, _rx) = ChannelNotifier::new();

        let mut settings = fast_settings(1000);
        settings.min_delay = 1;
        settings.max_delay = 1;

        let job = TransferJob::new(
            NetworkId::Base,
            test_wallet(),
            Arc::clone(&client) as Arc<dyn ChainClient>,
            settings,
            Arc::clone(&state),
            notifier,
        );
        let handle = tokio::spawn(job.run());

        tokio::time::sleep(Duration::from_millis(200)).await;
        state.request_stop();
        handle.await.unwrap();

        let report = state.report_snapshot().await;
        let entry = report_entry(&report);
        assert!(entry.success >= 1);
        assert!(entry.success < 1000);
        assert_eq!(entry.fail, 0);
        assert_eq!(client.sent().len(), entry.success as usize);
    }

    #[tokio::test]
    async fn test_initial_nonce_failure_reports_zeroed_result() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        client.fail_nonce_query();

        let (state, events) = run_job(Arc::clone(&client), fast_settings(5)).await;

        let report = state.report_snapshot().await;
        let entry = report_entry(&report);
        assert_eq!(entry.success, 0);
        assert_eq!(entry.fail, 0);
        assert!(client.sent().is_empty());
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::TransferFailed { .. })));
    }

    #[tokio::test]
    async fn test_progress_event_every_tenth_iteration() {
        let client = MockChainClient::new(NetworkId::Base.chain_id());
        let (_, events) = run_job(Arc::clone(&client), fast_settings(25)).await;

        let progress: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress { completed, .. } => Some(*completed),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![10, 20]);
    }

    #[test]
    fn test_draw_amount_stays_in_range() {
        let min_wei = parse_ether("0.000000001").unwrap();
        let max_wei = parse_ether("0.000000005").unwrap();
        for _ in 0..200 {
            let amount = draw_amount(0.000000001, 0.000000005).unwrap();
            assert!(amount >= min_wei && amount <= max_wei);
        }
    }

    #[test]
    fn test_draw_delay_stays_in_range() {
        for _ in 0..200 {
            let delay = draw_delay_ms(15, 30);
            assert!((15_000..=30_000).contains(&delay));
        }
    }
}
