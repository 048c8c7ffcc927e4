use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::event::Event;

/// What a full queue does with the next event.
///
/// The producer is a hardware callback, so it never waits on a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backpressure {
    /// Evict the oldest queued event to make room. Suits streams where only
    /// the latest state matters.
    DropOldest,
    /// Discard the incoming event and keep what is queued.
    DropNewest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub backpressure: Backpressure,
}

impl QueueConfig {
    /// Capacity is clamped to at least one event.
    pub fn new(capacity: usize, backpressure: Backpressure) -> Self {
        Self {
            capacity: capacity.max(1),
            backpressure,
        }
    }
}

/// Result of offering an event to a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    Queued,
    /// Queued after evicting the oldest event.
    QueuedEvicting,
    Rejected,
    Closed,
}

struct State {
    items: VecDeque<Event>,
    closed: bool,
    dropped: u64,
}

/// Bounded single-consumer queue shared by the hub and one subscription.
pub(crate) struct EventQueue {
    state: Mutex<State>,
    ready: Condvar,
    #[cfg(feature = "async")]
    notify: tokio::sync::Notify,
    config: QueueConfig,
}

impl EventQueue {
    pub(crate) fn new(config: QueueConfig) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(config.capacity.min(64)),
                closed: false,
                dropped: 0,
            }),
            ready: Condvar::new(),
            #[cfg(feature = "async")]
            notify: tokio::sync::Notify::new(),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking consumer must not take the producer down with it.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Never blocks. Offering to a closed queue is a no-op.
    pub(crate) fn offer(&self, event: Event) -> Offer {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return Offer::Closed;
            }
            if state.items.len() < self.config.capacity {
                state.items.push_back(event);
                Offer::Queued
            } else {
                state.dropped = state.dropped.saturating_add(1);
                match self.config.backpressure {
                    Backpressure::DropNewest => return Offer::Rejected,
                    Backpressure::DropOldest => {
                        state.items.pop_front();
                        state.items.push_back(event);
                        Offer::QueuedEvicting
                    }
                }
            }
        };
        self.wake();
        outcome
    }

    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.wake();
    }

    fn wake(&self) {
        self.ready.notify_all();
        #[cfg(feature = "async")]
        self.notify.notify_one();
    }

    pub(crate) fn try_pop(&self) -> Option<Event> {
        self.lock().items.pop_front()
    }

    /// Block until an event arrives. `None` once closed and drained.
    pub(crate) fn pop(&self) -> Option<Event> {
        let mut state = self.lock();
        loop {
            if let Some(event) = state.items.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            state = match self.ready.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(event) = state.items.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            state = match self.ready.wait_timeout(state, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    #[cfg(feature = "async")]
    pub(crate) async fn pop_async(&self) -> Option<Event> {
        loop {
            {
                let mut state = self.lock();
                if let Some(event) = state.items.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            // notify_one stores a permit, so a wake between the check and
            // this await is not lost.
            self.notify.notified().await;
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub(crate) fn config(&self) -> QueueConfig {
        self.config
    }
}
