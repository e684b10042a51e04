//! Real-time delivery of publish and delete events.
//!
//! A single logical channel carries every [`RealtimeEvent`] raised by
//! the fan-out engine. One [`RelayWorker`] per process drains it and
//! forwards wire frames to the live subscriber connections held in the
//! [`LiveRegistry`]. Delivery is best effort: a subscriber that cannot
//! accept a frame is dropped from the registry and never blocks the
//! others.

mod events;
mod registry;
mod relay;

pub use events::{EventBus, RealtimeEvent};
pub use registry::{DeliveryOutcome, LiveHandle, LiveRegistry};
pub use relay::{RelayHandle, RelayWorker};
