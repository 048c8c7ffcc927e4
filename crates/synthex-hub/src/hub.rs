use std::sync::{Arc, Mutex, MutexGuard};

use synthex_transport::DeviceId;
use tracing::{debug, warn};

use crate::config::HubConfig;
use crate::event::{Event, EventKind};
use crate::queue::{EventQueue, Offer, QueueConfig};
use crate::subscription::Subscription;

struct Entry {
    id: u64,
    kinds: Vec<EventKind>,
    queue: Arc<EventQueue>,
}

#[derive(Default)]
struct Entries {
    next_id: u64,
    list: Vec<Entry>,
}

/// Subscriber set of one device.
#[derive(Default)]
pub(crate) struct Registry {
    entries: Mutex<Entries>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Entries> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn remove(&self, id: u64) {
        self.lock().list.retain(|entry| entry.id != id);
    }
}

/// Fans events for one device out to every subscriber of the matching kind.
pub struct ChannelHub {
    device: DeviceId,
    config: HubConfig,
    registry: Arc<Registry>,
}

impl ChannelHub {
    pub fn new(device: DeviceId) -> Self {
        Self::with_config(device, HubConfig::default())
    }

    pub fn with_config(device: DeviceId, config: HubConfig) -> Self {
        Self {
            device,
            config,
            registry: Arc::new(Registry::default()),
        }
    }

    /// Register a new consumer for `kind`.
    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        self.register(vec![kind], self.config.queue(kind))
    }

    /// Register one consumer for several kinds sharing a single queue, so
    /// events come out in the order they were published. An empty `kinds`
    /// means every kind.
    pub fn subscribe_many(&self, kinds: &[EventKind], queue: QueueConfig) -> Subscription {
        let mut merged: Vec<EventKind> = Vec::with_capacity(EventKind::ALL.len());
        for &kind in kinds {
            if !merged.contains(&kind) {
                merged.push(kind);
            }
        }
        if merged.is_empty() {
            merged.extend(EventKind::ALL);
        }
        self.register(merged, queue)
    }

    fn register(&self, kinds: Vec<EventKind>, config: QueueConfig) -> Subscription {
        let queue = Arc::new(EventQueue::new(config));
        let id = {
            let mut entries = self.registry.lock();
            let id = entries.next_id;
            entries.next_id += 1;
            entries.list.push(Entry {
                id,
                kinds: kinds.clone(),
                queue: Arc::clone(&queue),
            });
            id
        };
        debug!(device = %self.device, kinds = ?kinds, id, "subscriber registered");
        Subscription::new(id, self.device, kinds, queue, Arc::downgrade(&self.registry))
    }

    /// Deliver `event` to every live subscriber of its kind.
    ///
    /// Never blocks on a consumer. Returns how many queues accepted the event.
    pub fn publish(&self, event: &Event) -> usize {
        let kind = event.kind();
        let mut entries = self.registry.lock();
        let mut delivered = 0usize;
        let mut saw_closed = false;

        for entry in entries.list.iter().filter(|entry| entry.kinds.contains(&kind)) {
            match entry.queue.offer(event.clone()) {
                Offer::Queued => delivered += 1,
                Offer::QueuedEvicting => {
                    delivered += 1;
                    warn!(
                        device = %self.device,
                        %kind,
                        id = entry.id,
                        dropped = entry.queue.dropped(),
                        "subscriber queue full, dropped oldest event"
                    );
                }
                Offer::Rejected => {
                    warn!(
                        device = %self.device,
                        %kind,
                        id = entry.id,
                        dropped = entry.queue.dropped(),
                        "subscriber queue full, dropped new event"
                    );
                }
                Offer::Closed => saw_closed = true,
            }
        }

        if saw_closed {
            entries.list.retain(|entry| !entry.queue.is_closed());
        }
        delivered
    }

    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.subscriber_count(kind) > 0
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .list
            .iter()
            .filter(|entry| entry.kinds.contains(&kind) && !entry.queue.is_closed())
            .count()
    }

    /// Close and deregister every subscription.
    pub fn close_all(&self) {
        let drained: Vec<Entry> = std::mem::take(&mut self.registry.lock().list);
        for entry in &drained {
            entry.queue.close();
        }
        if !drained.is_empty() {
            debug!(device = %self.device, count = drained.len(), "closed all subscribers");
        }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

impl Drop for ChannelHub {
    fn drop(&mut self) {
        self.close_all();
    }
}
