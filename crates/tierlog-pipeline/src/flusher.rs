//! Background flush task.

use std::sync::Weak;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::pipeline::Pipeline;

/// Handle to the running background task.
pub(crate) struct FlushTask {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl FlushTask {
    /// Spawn the periodic loop on the current runtime.
    ///
    /// The task holds only a weak reference, so an abandoned pipeline is
    /// dropped and the loop exits on its next tick.
    pub fn spawn(pipeline: Weak<Pipeline>, period: std::time::Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run(pipeline, period, shutdown_rx));
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the loop and wait for any in-progress tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            warn!(subsystem = "pipeline", error = %e, "Background flush task ended abnormally");
        }
    }
}

async fn run(
    pipeline: Weak<Pipeline>,
    period: std::time::Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    info!(
        subsystem = "pipeline",
        component = "flusher",
        interval_ms = period.as_millis() as u64,
        "Background flush task started"
    );

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_drain = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!(subsystem = "pipeline", component = "flusher", "Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let Some(pipeline) = pipeline.upgrade() else {
                    break;
                };
                pipeline.tick(&mut last_drain).await;
            }
        }
    }

    info!(subsystem = "pipeline", component = "flusher", "Background flush task stopped");
}
