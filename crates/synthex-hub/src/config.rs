use synthex_frame::FrameConfig;

use crate::event::EventKind;
use crate::queue::{Backpressure, QueueConfig};

/// Queue sizes and overflow policy per event kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    pub raw: QueueConfig,
    pub message: QueueConfig,
    pub parameter_change: QueueConfig,
    pub note: QueueConfig,
}

impl HubConfig {
    pub fn queue(&self, kind: EventKind) -> QueueConfig {
        match kind {
            EventKind::Raw => self.raw,
            EventKind::Message => self.message,
            EventKind::ParameterChange => self.parameter_change,
            EventKind::Note => self.note,
        }
    }

    pub fn with_queue(mut self, kind: EventKind, queue: QueueConfig) -> Self {
        match kind {
            EventKind::Raw => self.raw = queue,
            EventKind::Message => self.message = queue,
            EventKind::ParameterChange => self.parameter_change = queue,
            EventKind::Note => self.note = queue,
        }
        self
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            // Dumps are large and each one matters: keep the backlog, shed new.
            raw: QueueConfig::new(32, Backpressure::DropNewest),
            message: QueueConfig::new(32, Backpressure::DropNewest),
            // Only the latest value of a knob sweep is interesting.
            parameter_change: QueueConfig::new(256, Backpressure::DropOldest),
            note: QueueConfig::new(256, Backpressure::DropNewest),
        }
    }
}

/// Settings for a [`ConnectionCoordinator`](crate::ConnectionCoordinator).
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    pub frame: FrameConfig,
    pub hub: HubConfig,
}

impl CoordinatorConfig {
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_hub_config(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }
}
