//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use docstore::DocumentStore;
use signaling::CallSignaling;
use telemetry::metrics;

use crate::missed_call::MissedCallWorker;
use crate::retention::RetentionWorker;
use crate::trial_sweep::TrialSweepWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Missed-call sweep interval
    pub missed_call_interval: Duration,
    /// Trial expiry sweep interval
    pub trial_sweep_interval: Duration,
    /// Retention sweep interval
    pub retention_interval: Duration,
    /// Metrics log interval
    pub metrics_log_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            missed_call_interval: Duration::from_secs(10),
            trial_sweep_interval: Duration::from_secs(30),
            retention_interval: Duration::from_secs(3600), // 1 hour
            metrics_log_interval: Duration::from_secs(60), // 1 minute
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<dyn DocumentStore>,
    signaling: Arc<CallSignaling>,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn DocumentStore>,
        signaling: Arc<CallSignaling>,
    ) -> Self {
        Self {
            config,
            store,
            signaling,
        }
    }

    /// Starts all background workers.
    ///
    /// The returned handles are aborted by the daemon on shutdown.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_missed_call_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_trial_sweep_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_retention_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log().await;
        }));

        info!("Background workers started");
        handles
    }

    async fn run_missed_call_worker(&self) {
        let worker = MissedCallWorker::new(self.store.clone(), self.signaling.clone());
        let mut ticker = interval(self.config.missed_call_interval);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run().await {
                error!("Missed-call worker error: {}", e);
            }
        }
    }

    async fn run_trial_sweep_worker(&self) {
        let worker = TrialSweepWorker::new(self.store.clone());
        let mut ticker = interval(self.config.trial_sweep_interval);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run().await {
                error!("Trial sweep worker error: {}", e);
            }
        }
    }

    async fn run_retention_worker(&self) {
        let worker = RetentionWorker::new(self.store.clone(), self.signaling.clone());
        let mut ticker = interval(self.config.retention_interval);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run().await {
                error!("Retention worker error: {}", e);
            }
        }
    }

    async fn run_metrics_log(&self) {
        let mut ticker = interval(self.config.metrics_log_interval);

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            info!(
                calls_created = snapshot.calls_created,
                calls_accepted = snapshot.calls_accepted,
                calls_missed = snapshot.calls_missed,
                calls_ended = snapshot.calls_ended,
                transition_conflicts = snapshot.transition_conflicts,
                trials_started = snapshot.trials_started,
                trials_expired = snapshot.trials_expired,
                trials_converted = snapshot.trials_converted,
                messages_blocked = snapshot.messages_blocked,
                store_errors = snapshot.store_errors,
                "metrics snapshot"
            );
        }
    }
}
