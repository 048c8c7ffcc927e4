use std::fmt;
use std::sync::Arc;

use synthex_codec::{CodecError, DecodedMessage, ParameterId};
use synthex_frame::RawFrame;

/// The independent streams a consumer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Every reassembled SysEx frame, undecoded.
    Raw,
    /// Decoded messages, plus one [`Event::DecodeFailed`] per bad frame.
    Message,
    /// Parameter changes from real-time control changes.
    ParameterChange,
    Note,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Raw,
        EventKind::Message,
        EventKind::ParameterChange,
        EventKind::Note,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Message => "message",
            Self::ParameterChange => "parameter-change",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter moved by a real-time control change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterChange {
    pub channel: u8,
    pub parameter: ParameterId,
    pub value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    /// `false` for note-off, including note-on with velocity 0.
    pub on: bool,
}

/// One item delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Raw(RawFrame),
    Message(Arc<DecodedMessage>),
    DecodeFailed { frame: RawFrame, error: CodecError },
    ParameterChange(ParameterChange),
    Note(NoteEvent),
}

impl Event {
    /// The stream this event travels on.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Raw(_) => EventKind::Raw,
            Self::Message(_) | Self::DecodeFailed { .. } => EventKind::Message,
            Self::ParameterChange(_) => EventKind::ParameterChange,
            Self::Note(_) => EventKind::Note,
        }
    }
}
