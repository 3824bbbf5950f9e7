//! Live subscriber registry and broadcast fan-out.

mod broadcast;
mod subscriber;

pub use broadcast::BroadcastManager;
pub use subscriber::{DeliveryError, Payload, SubscriberId, SubscriberSink};
