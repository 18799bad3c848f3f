//! Periodic repository scanning
//!
//! The scheduler owns a tokio task that runs [`RepositoryScanner::try_scan`]
//! on the blocking pool at a fixed interval, plus on demand through
//! [`ScanScheduler::trigger`]. The first tick fires immediately, so the
//! repository is reconciled as soon as the scheduler is spawned.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::DeploymentConfig;
use crate::scanner::RepositoryScanner;

/// Handle to a running scan loop.
pub struct ScanScheduler {
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    completed_rx: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl ScanScheduler {
    /// Spawn the scan loop on the current tokio runtime.
    pub fn spawn(scanner: Arc<RepositoryScanner>, period: Duration) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (completed_tx, completed_rx) = watch::channel(0);

        let handle = tokio::spawn(run_loop(scanner, period, trigger_rx, shutdown_rx, completed_tx));
        tracing::info!(interval_secs = period.as_secs(), "Scan scheduler started");

        Self {
            trigger_tx,
            shutdown_tx,
            completed_rx,
            handle,
        }
    }

    /// Spawn a scheduler as configured, or `None` when scanning is disabled.
    pub fn from_config(scanner: Arc<RepositoryScanner>, config: &DeploymentConfig) -> Option<Self> {
        if !config.enabled {
            tracing::info!("Repository scanning disabled");
            return None;
        }
        Some(Self::spawn(scanner, config.update_interval()))
    }

    /// Request a scan without waiting for the next tick.
    ///
    /// Requests made while one is already pending are merged.
    pub fn trigger(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Number of scans that have run to completion so far.
    pub fn completed_scans(&self) -> u64 {
        *self.completed_rx.borrow()
    }

    /// Receiver notified each time a scan completes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.completed_rx.clone()
    }

    /// Stop the loop and wait for the scan in progress, if any.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Scan scheduler task failed");
        }
        tracing::info!("Scan scheduler stopped");
    }
}

async fn run_loop(
    scanner: Arc<RepositoryScanner>,
    period: Duration,
    mut trigger_rx: mpsc::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
    completed_tx: watch::Sender<u64>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Some(()) = trigger_rx.recv() => {
                tracing::debug!("Triggered repository scan");
            }
            _ = shutdown_rx.changed() => break,
        }
        if *shutdown_rx.borrow() {
            break;
        }

        let cycle_scanner = Arc::clone(&scanner);
        match tokio::task::spawn_blocking(move || cycle_scanner.try_scan()).await {
            Ok(Some(Ok(_))) => {
                completed_tx.send_modify(|count| *count += 1);
            }
            Ok(Some(Err(e))) => {
                tracing::error!(error = %e, "Repository scan failed");
            }
            Ok(None) => {
                tracing::debug!("Repository scan already running, skipping tick");
            }
            Err(e) => {
                tracing::error!(error = %e, "Repository scan task panicked");
            }
        }
    }
}
