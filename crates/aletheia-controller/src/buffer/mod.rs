//! Bounded in-memory buffers for recent telemetry.

mod event;
mod ring;

pub use event::EventBuffer;
pub use ring::RingBuffer;
