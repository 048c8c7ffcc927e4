//! Channel-voice parsing for the real-time control protocol.
//!
//! Runs beside the SysEx assembler on the same byte stream. Only note on/off
//! and control change produce output; every other status is consumed so its
//! data bytes are not misread.

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const CHANNEL_PRESSURE: u8 = 0xD0;
const SYSEX_START: u8 = 0xF0;
const REALTIME_FIRST: u8 = 0xF8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

/// Byte-at-a-time channel-voice parser with running status.
#[derive(Debug, Default)]
pub struct VoiceParser {
    status: Option<u8>,
    data: [u8; 2],
    len: usize,
    in_sysex: bool,
}

impl VoiceParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Option<VoiceMessage> {
        if byte >= REALTIME_FIRST {
            // Clock and friends may appear anywhere without disturbing state.
            return None;
        }
        if byte >= SYSEX_START {
            // System common (SysEx included) cancels running status.
            self.status = None;
            self.len = 0;
            self.in_sysex = byte == SYSEX_START;
            return None;
        }
        if byte & 0x80 != 0 {
            self.status = Some(byte);
            self.len = 0;
            self.in_sysex = false;
            return None;
        }
        if self.in_sysex {
            return None;
        }

        let status = self.status?;
        self.data[self.len] = byte;
        self.len += 1;
        if self.len < data_len(status) {
            return None;
        }
        self.len = 0;

        let channel = status & 0x0F;
        let [first, second] = self.data;
        match status & 0xF0 {
            NOTE_ON if second == 0 => Some(VoiceMessage::NoteOff {
                channel,
                note: first,
                velocity: 0,
            }),
            NOTE_ON => Some(VoiceMessage::NoteOn {
                channel,
                note: first,
                velocity: second,
            }),
            NOTE_OFF => Some(VoiceMessage::NoteOff {
                channel,
                note: first,
                velocity: second,
            }),
            CONTROL_CHANGE => Some(VoiceMessage::ControlChange {
                channel,
                controller: first,
                value: second,
            }),
            _ => None,
        }
    }

    /// Forget running status and any partial message.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn data_len(status: u8) -> usize {
    match status & 0xF0 {
        PROGRAM_CHANGE | CHANNEL_PRESSURE => 1,
        _ => 2,
    }
}
