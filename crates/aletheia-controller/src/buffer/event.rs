//! Lock-guarded event buffer shared between ingest handlers and sessions.

use tokio::sync::RwLock;

use super::RingBuffer;

/// Append-only buffer retaining the most recent entries.
///
/// The lock is only held for the duration of a push or a copy-out, never
/// across I/O.
#[derive(Debug)]
pub struct EventBuffer<T> {
    entries: RwLock<RingBuffer<T>>,
    capacity: usize,
}

impl<T: Clone> EventBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let ring = RingBuffer::new(capacity);
        let capacity = ring.capacity();
        Self {
            entries: RwLock::new(ring),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one on overflow.
    pub async fn append(&self, entry: T) {
        self.entries.write().await.push(entry);
    }

    /// The last `min(n, len)` entries in insertion order.
    pub async fn recent(&self, n: usize) -> Vec<T> {
        self.entries.read().await.tail(n).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
