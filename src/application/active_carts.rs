//! Periodic sampling of how many carts currently hold items.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::errors::DomainError;
use crate::domain::metrics::{MetricsEmitter, ACTIVE_CARTS_COUNT};
use crate::domain::ports::CartRepository;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

pub struct ActiveCartsMonitor;

impl ActiveCartsMonitor {
    /// Spawns the sampling loop on the current tokio runtime. The first
    /// sample is taken immediately.
    pub fn start<C>(repo: Arc<C>, metrics: Arc<dyn MetricsEmitter>, interval: Duration) -> MonitorHandle
    where
        C: CartRepository,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        match sample(Arc::clone(&repo)).await {
                            Ok(count) => metrics.gauge(ACTIVE_CARTS_COUNT, count as f64, &[]),
                            Err(e) => log::warn!("active carts sample failed: {e}"),
                        }
                    }
                }
            }
            log::debug!("active carts monitor stopped");
        });

        MonitorHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

async fn sample<C: CartRepository>(repo: Arc<C>) -> Result<i64, DomainError> {
    tokio::task::spawn_blocking(move || repo.count_active_carts())
        .await
        .map_err(|e| DomainError::Store(e.to_string()))?
}

/// Owns the monitor task. Dropping the handle signals the task to stop
/// without waiting for it.
pub struct MonitorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Signals the loop to exit and waits for the task to finish. A sample
    /// already in flight completes first.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("active carts monitor task failed: {e}");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
