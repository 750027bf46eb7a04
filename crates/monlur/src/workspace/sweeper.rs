//! Periodic reclamation of orphaned workspace artifacts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::broadcast;

use super::manager::WorkspaceManager;

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Runs [`WorkspaceManager::sweep`] on a fixed interval in a background thread.
pub struct SweepScheduler {
    manager: Arc<WorkspaceManager>,
    interval: Duration,
    retention: Duration,
    shutdown: Arc<AtomicBool>,
    trigger_tx: broadcast::Sender<()>,
}

impl SweepScheduler {
    pub fn new(manager: Arc<WorkspaceManager>, interval: Duration, retention: Duration) -> Self {
        let (trigger_tx, _) = broadcast::channel(8);
        Self {
            manager,
            interval,
            retention,
            shutdown: Arc::new(AtomicBool::new(false)),
            trigger_tx,
        }
    }

    /// Start the sweep loop in a background thread.
    pub fn start(&self) -> std::io::Result<JoinHandle<()>> {
        let manager = Arc::clone(&self.manager);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;
        let retention = self.retention;
        let mut trigger_rx = self.trigger_tx.subscribe();

        std::thread::Builder::new()
            .name("workspace-sweeper".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Workspace sweeper could not start its runtime: {}", e);
                        return;
                    }
                };

                rt.block_on(async {
                    let mut interval_timer = tokio::time::interval(interval);
                    interval_timer.tick().await; // skip immediate first tick

                    loop {
                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }

                        tokio::select! {
                            _ = interval_timer.tick() => {},
                            Ok(()) = trigger_rx.recv() => {
                                log::debug!("Workspace sweep triggered");
                            },
                        }

                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }

                        let report = manager.sweep(retention);
                        if report.removed > 0 || report.failed > 0 {
                            log::info!(
                                "Workspace sweep: {} scanned, {} removed, {} failed",
                                report.scanned,
                                report.removed,
                                report.failed
                            );
                        }
                    }
                    log::debug!("Workspace sweeper stopped");
                });
            })
    }

    /// Requests an immediate sweep.
    pub fn trigger(&self) {
        let _ = self.trigger_tx.send(());
    }

    /// Signals the scheduler to stop and wakes it.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.trigger_tx.send(());
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
