// src/dispatcher/mod.rs
pub(crate) mod job;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::config::Settings;
use crate::error::{FarmError, FarmResult};
use crate::network::{NetworkId, ProviderPool};
use crate::notify::{Notifier, RunEvent};
use crate::report;
use crate::types::{JobProgress, JobResult, Report, RunStatus};
use crate::wallet::WalletIdentity;

use job::TransferJob;

/// State shared by the dispatcher and every job of the current run.
///
/// Jobs run on a multi-threaded runtime, so the collections sit behind
/// locks; each job only ever writes its own progress entry and its one
/// terminal report entry.
pub struct RunState {
    running: AtomicBool,
    stop_requested: AtomicBool,
    active: RwLock<HashMap<String, JobProgress>>,
    report: RwLock<Report>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            active: RwLock::new(HashMap::new()),
            report: RwLock::new(Report::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Claim the run slot and reset per-run state. Fails without mutating
    /// anything when a run is already in flight.
    async fn begin_run(&self) -> FarmResult<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FarmError::Precondition(
                "a transfer run is already in progress".to_string(),
            ));
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        self.active.write().await.clear();
        self.report.write().await.clear();
        Ok(())
    }

    async fn end_run(&self) {
        self.active.write().await.clear();
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) async fn insert_active(&self, progress: JobProgress) {
        let key = Report::key(progress.network, progress.wallet_ordinal);
        self.active.write().await.insert(key, progress);
    }

    pub(crate) async fn update_progress(
        &self,
        network: NetworkId,
        wallet_ordinal: u32,
        completed: u32,
        success: u32,
        fail: u32,
    ) {
        let key = Report::key(network, wallet_ordinal);
        if let Some(progress) = self.active.write().await.get_mut(&key) {
            progress.completed = completed;
            progress.success = success;
            progress.fail = fail;
        }
    }

    /// Terminal bookkeeping for one job: report entry in, active entry out
    pub(crate) async fn finish_job(&self, result: JobResult) {
        let key = Report::key(result.network, result.wallet_ordinal);
        self.report.write().await.insert(result);
        self.active.write().await.remove(&key);
    }

    pub async fn active_snapshot(&self) -> Vec<JobProgress> {
        let mut jobs: Vec<JobProgress> = self.active.read().await.values().cloned().collect();
        jobs.sort_by_key(|p| (p.wallet_ordinal, p.network.key()));
        jobs
    }

    pub async fn report_snapshot(&self) -> Report {
        self.report.read().await.clone()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fans one transfer sequence out per (network, wallet) pair and waits for
/// all of them, regardless of individual failures.
pub struct Dispatcher {
    settings: Settings,
    notifier: Arc<dyn Notifier>,
    state: Arc<RunState>,
    report_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(settings: Settings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            settings,
            notifier,
            state: Arc::new(RunState::new()),
            report_dir: PathBuf::from("."),
        }
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one batch across the selected networks and wallets.
    ///
    /// Connection failures exclude a network from the run; they never abort
    /// it. Returns once every spawned job has reached a terminal state.
    pub async fn run(
        &self,
        networks: &[NetworkId],
        wallets: &[WalletIdentity],
    ) -> FarmResult<Report> {
        if networks.is_empty() {
            return Err(FarmError::Precondition("no networks selected".to_string()));
        }
        if wallets.is_empty() {
            return Err(FarmError::Precondition("no wallets selected".to_string()));
        }
        self.state.begin_run().await?;

        self.notifier
            .notify(RunEvent::RunStarted {
                networks: networks.len(),
                wallets: wallets.len(),
            })
            .await;

        let (pool, skipped) = ProviderPool::connect(networks).await;
        for (network, err) in skipped {
            self.notifier
                .notify(RunEvent::NetworkSkipped {
                    network,
                    reason: err.to_string(),
                })
                .await;
        }

        Ok(self.execute(pool, wallets).await)
    }

    /// `run` with an already-connected pool; exercised directly by tests
    #[cfg(test)]
    pub(crate) async fn run_with_pool(
        &self,
        pool: ProviderPool,
        wallets: &[WalletIdentity],
    ) -> FarmResult<Report> {
        if wallets.is_empty() {
            return Err(FarmError::Precondition("no wallets selected".to_string()));
        }
        self.state.begin_run().await?;

        self.notifier
            .notify(RunEvent::RunStarted {
                networks: pool.len(),
                wallets: wallets.len(),
            })
            .await;

        Ok(self.execute(pool, wallets).await)
    }

    async fn execute(&self, pool: ProviderPool, wallets: &[WalletIdentity]) -> Report {
        let mut handles = Vec::new();

        'spawn: for provider in pool.handles() {
            for wallet in wallets {
                if self.state.stop_requested() {
                    break 'spawn;
                }
                let job = TransferJob::new(
                    provider.network,
                    wallet.clone(),
                    Arc::clone(&provider.client),
                    self.settings.clone(),
                    Arc::clone(&self.state),
                    Arc::clone(&self.notifier),
                );
                handles.push(tokio::spawn(job.run()));
            }
        }

        // A panicking job must not take its siblings down with it.
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "transfer job aborted");
            }
        }

        self.state.end_run().await;
        let report = self.state.report_snapshot().await;

        let totals = report::totals(&report);
        if let Err(err) = report::persist(&report, &self.settings, &self.report_dir) {
            tracing::warn!(error = %err, "could not persist run report");
        }

        self.notifier
            .notify(RunEvent::RunFinished {
                success: totals.success,
                fail: totals.fail,
            })
            .await;

        report
    }

    /// Cooperative stop: jobs observe the flag at iteration boundaries.
    /// In-flight network calls are never cancelled.
    pub fn request_stop(&self) -> FarmResult<()> {
        if !self.state.is_running() {
            return Err(FarmError::Precondition(
                "no transfer run in progress".to_string(),
            ));
        }
        self.state.request_stop();
        Ok(())
    }

    pub async fn status(&self) -> RunStatus {
        RunStatus {
            running: self.state.is_running(),
            active: self.state.active_snapshot().await,
        }
    }

    /// Report of the most recent run; cleared when the next run starts
    pub async fn last_report(&self) -> Report {
        self.state.report_snapshot().await
    }
}
