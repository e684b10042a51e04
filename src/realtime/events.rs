//! Realtime event definitions and the process-wide broadcast channel.

use metrics::counter;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::types::{AccountId, PostId};
use stormo_api_types::{FrameKind, RealtimeFrame};

const METRIC_EVENTS_PUBLISHED: &str = "stormo_realtime_events_total";

/// An event raised by the fan-out engine after a durable write.
///
/// Events are transient: they live on the channel until the relay drains
/// them and are never persisted or replayed. `Posted` carries the
/// recipient set resolved at fan-out time so the relay can target
/// currently-connected followers; `Deleted` carries no recipients
/// because deletions go to every live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    Posted {
        post_id: PostId,
        publisher_id: AccountId,
        content: String,
        recipients: Vec<AccountId>,
    },
    Deleted {
        post_id: PostId,
        publisher_id: AccountId,
    },
}

impl RealtimeEvent {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Posted { .. } => "posted",
            Self::Deleted { .. } => "deleted",
        }
    }

    pub fn post_id(&self) -> PostId {
        match self {
            Self::Posted { post_id, .. } | Self::Deleted { post_id, .. } => *post_id,
        }
    }

    pub fn publisher_id(&self) -> AccountId {
        match self {
            Self::Posted { publisher_id, .. } | Self::Deleted { publisher_id, .. } => *publisher_id,
        }
    }

    /// The wire shape pushed to subscriber sockets.
    pub fn frame(&self) -> RealtimeFrame {
        match self {
            Self::Posted {
                post_id,
                publisher_id,
                content,
                ..
            } => RealtimeFrame {
                kind: FrameKind::Posted,
                post_id: *post_id,
                publisher_id: *publisher_id,
                content: Some(content.clone()),
            },
            Self::Deleted {
                post_id,
                publisher_id,
            } => RealtimeFrame {
                kind: FrameKind::Deleted,
                post_id: *post_id,
                publisher_id: *publisher_id,
                content: None,
            },
        }
    }
}

/// Publishing side of the realtime channel.
///
/// Cheap to clone; every fan-out call publishes through the same
/// underlying sender while exactly one [`super::RelayWorker`] owns the
/// receiving half.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<RealtimeEvent>,
}

impl EventBus {
    /// Create the channel, returning the bus and the receiver the relay
    /// worker drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RealtimeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event for the relay. Best effort: when the relay has
    /// already shut down the event is dropped with a warning, never an
    /// error, because realtime delivery is not part of the publish
    /// contract.
    pub fn publish(&self, event: RealtimeEvent) {
        let kind = event.kind_label();
        counter!(METRIC_EVENTS_PUBLISHED, "kind" => kind).increment(1);

        info!(
            event_kind = kind,
            post_id = event.post_id(),
            publisher_id = event.publisher_id(),
            "realtime event enqueued"
        );

        if self.tx.send(event).is_err() {
            warn!(event_kind = kind, "realtime relay gone; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posted_frame_carries_content() {
        let event = RealtimeEvent::Posted {
            post_id: 4,
            publisher_id: 2,
            content: "ciao".into(),
            recipients: vec![5, 6],
        };
        let frame = event.frame();
        assert_eq!(frame.kind, FrameKind::Posted);
        assert_eq!(frame.post_id, 4);
        assert_eq!(frame.publisher_id, 2);
        assert_eq!(frame.content.as_deref(), Some("ciao"));
    }

    #[test]
    fn deleted_frame_has_no_content() {
        let event = RealtimeEvent::Deleted {
            post_id: 4,
            publisher_id: 2,
        };
        let frame = event.frame();
        assert_eq!(frame.kind, FrameKind::Deleted);
        assert_eq!(frame.content, None);
    }

    #[tokio::test]
    async fn bus_hands_events_to_the_receiver() {
        let (bus, mut rx) = EventBus::channel();
        let event = RealtimeEvent::Deleted {
            post_id: 1,
            publisher_id: 2,
        };
        bus.publish(event.clone());
        assert_eq!(rx.recv().await, Some(event));
    }

    #[test]
    fn publish_after_receiver_drop_is_silent() {
        let (bus, rx) = EventBus::channel();
        drop(rx);
        bus.publish(RealtimeEvent::Deleted {
            post_id: 1,
            publisher_id: 2,
        });
    }
}
