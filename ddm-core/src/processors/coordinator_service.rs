//! CoordinatorService processor.
//!
//! The service owns one [`Coordinator`] and is its only caller, which keeps
//! every coordinator operation on one logical thread. It:
//! - applies `Ingress` messages in arrival order
//! - polls the change detector on a tokio interval
//! - hands the coordinator back when shut down, so the host can inspect
//!   the final state

use crate::coordinator::Coordinator;
use crate::events::IngressReceiver;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

pub struct CoordinatorService {
    coordinator: Coordinator,
}

impl CoordinatorService {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    /// Run until shutdown is signaled or every ingress sender is dropped.
    ///
    /// Shutdown is checked before ingress, and ingress before the tick.
    /// One last poll runs on the way out.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut ingress_rx: IngressReceiver,
    ) -> Coordinator {
        // `interval` rejects a zero period.
        let period = self
            .coordinator
            .config()
            .tick_interval
            .max(Duration::from_millis(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(tick_interval = ?period, "CoordinatorService started");

        loop {
            tokio::select! {
                biased;

                // Shutdown has highest priority.
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("CoordinatorService received shutdown signal");
                        break;
                    }
                }

                message = ingress_rx.recv() => match message {
                    Some(message) => {
                        debug!(?message, "Ingress received");
                        self.coordinator.ingest(message);
                    }
                    None => {
                        info!("Ingress channel closed");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    self.coordinator.poll();
                }
            }
        }

        self.coordinator.poll();
        info!("CoordinatorService shutdown complete");
        self.coordinator
    }
}
