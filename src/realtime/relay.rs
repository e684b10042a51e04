//! The relay worker: one background task draining the realtime channel.

use metrics::counter;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument};

use super::events::RealtimeEvent;
use super::registry::{DeliveryOutcome, LiveRegistry};

const METRIC_DELIVERED: &str = "stormo_realtime_delivered_total";
const METRIC_PRUNED: &str = "stormo_realtime_pruned_total";

/// Drains the event channel and forwards frames to live subscribers.
///
/// Exactly one worker runs per process. It owns the receiving half of
/// the channel; shutdown is an explicit watch signal so the worker
/// finishes the event in hand instead of being aborted mid-delivery.
pub struct RelayWorker {
    registry: LiveRegistry,
    events: mpsc::UnboundedReceiver<RealtimeEvent>,
    shutdown: watch::Receiver<bool>,
}

/// Controls a spawned [`RelayWorker`].
pub struct RelayHandle {
    shutdown: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl RelayHandle {
    /// Signal the worker to stop and wait for it to drain out.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl RelayWorker {
    /// Spawn the worker onto the runtime and return its handle.
    pub fn spawn(
        registry: LiveRegistry,
        events: mpsc::UnboundedReceiver<RealtimeEvent>,
    ) -> RelayHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Self {
            registry,
            events,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(worker.run());
        RelayHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(mut self) {
        info!("realtime relay started");
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.dispatch(event),
                        // Every bus clone dropped; nothing left to relay.
                        None => break,
                    }
                }
            }
        }
        info!("realtime relay stopped");
    }

    /// Deliver one event: posted frames go to the recipients resolved at
    /// fan-out time, deletions go to every live connection.
    #[instrument(skip(self, event), fields(event_kind = event.kind_label(), post_id = event.post_id()))]
    fn dispatch(&self, event: RealtimeEvent) {
        let frame = event.frame();
        let outcome = match &event {
            RealtimeEvent::Posted { recipients, .. } => {
                let mut total = DeliveryOutcome::default();
                for &recipient in recipients {
                    let one = self.registry.deliver_to(recipient, &frame);
                    total.delivered += one.delivered;
                    total.pruned += one.pruned;
                }
                total
            }
            RealtimeEvent::Deleted { .. } => self.registry.deliver_all(&frame),
        };

        counter!(METRIC_DELIVERED, "kind" => event.kind_label())
            .increment(outcome.delivered as u64);
        if outcome.pruned > 0 {
            counter!(METRIC_PRUNED).increment(outcome.pruned as u64);
        }
        debug!(
            delivered = outcome.delivered,
            pruned = outcome.pruned,
            "realtime event dispatched"
        );
    }
}
