use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use synthex_transport::DeviceId;

use crate::event::{Event, EventKind};
use crate::hub::Registry;
use crate::queue::EventQueue;

/// One consumer's registration with a device hub.
///
/// Cancelling (or dropping) stops delivery and deregisters from the hub.
/// Events already queued can still be drained after cancellation.
pub struct Subscription {
    id: u64,
    device: DeviceId,
    kinds: Vec<EventKind>,
    queue: Arc<EventQueue>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        device: DeviceId,
        kinds: Vec<EventKind>,
        queue: Arc<EventQueue>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            id,
            device,
            kinds,
            queue,
            registry,
        }
    }

    /// Wait for the next event. `None` once cancelled and drained.
    pub fn recv(&self) -> Option<Event> {
        self.queue.pop()
    }

    /// Like [`recv`](Self::recv), giving up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        self.queue.pop_timeout(timeout)
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.queue.try_pop()
    }

    #[cfg(feature = "async")]
    pub async fn recv_async(&self) -> Option<Event> {
        self.queue.pop_async().await
    }

    /// Stop delivery and deregister. Safe to call more than once, and
    /// concurrently with delivery.
    pub fn cancel(&self) {
        self.queue.close();
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.queue.is_closed()
    }

    /// Events discarded by the backpressure policy so far.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    /// Events waiting to be received.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The first kind this subscription receives.
    pub fn kind(&self) -> EventKind {
        self.kinds[0]
    }

    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }
}

impl Iterator for Subscription {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("device", &self.device)
            .field("kinds", &self.kinds)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
