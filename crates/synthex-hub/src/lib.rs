//! Per-device stream handling for the synthex stack.
//!
//! Inbound bytes for a device go through a [`ConnectionCoordinator`], which
//! owns that device's [`StreamAssembler`](synthex_frame::StreamAssembler),
//! real-time [`VoiceParser`] and [`ChannelHub`]. The hub fans each event out
//! to independent, bounded, cancellable [`Subscription`]s.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod hub;
mod queue;
pub mod realtime;
pub mod subscription;

pub use config::{CoordinatorConfig, HubConfig};
pub use coordinator::ConnectionCoordinator;
pub use error::{HubError, Result};
pub use event::{Event, EventKind, NoteEvent, ParameterChange};
pub use hub::ChannelHub;
pub use queue::{Backpressure, QueueConfig};
pub use realtime::{VoiceMessage, VoiceParser};
pub use subscription::Subscription;
