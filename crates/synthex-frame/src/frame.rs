use bytes::{BufMut, Bytes, BytesMut};

/// SysEx start marker.
pub const START: u8 = 0xF0;

/// SysEx end marker.
pub const END: u8 = 0xF7;

/// Start marker + manufacturer + machine + device.
pub const HEADER_SIZE: usize = 4;

/// Position of the command byte.
pub const COMMAND_INDEX: usize = 4;

/// Position of the program number in single-program messages.
pub const PROGRAM_NUMBER_INDEX: usize = 5;

/// First parameter byte of a single-program dump.
pub const PARAMETER_START: usize = 6;

/// First parameter byte of program 0 in an all dump.
pub const ALL_DUMP_PROGRAM_START: usize = 5;

/// First global-settings byte of an all dump.
pub const GLOBAL_START: usize = 585;

/// Parameters per program.
pub const PARAMETER_COUNT: usize = 29;

/// Programs held by the instrument.
pub const PROGRAM_COUNT: usize = 20;

/// Global-settings bytes carried by an all dump.
pub const GLOBAL_COUNT: usize = 6;

/// `F0 mm kk dd 00 pp <29 params> cs F7`.
pub const PROGRAM_DUMP_LEN: usize = 37;

/// `F0 mm kk dd 08 <20x29 params> <6 globals> cs F7`.
pub const ALL_DUMP_LEN: usize = 593;

/// `F0 mm kk dd 40 pp F7`.
pub const PROGRAM_REQUEST_LEN: usize = 7;

/// `F0 mm kk dd 41 F7` and `F0 mm kk dd 48 F7`.
pub const SHORT_REQUEST_LEN: usize = 6;

/// Manufacturer ID used when none is configured.
pub const DEFAULT_MANUFACTURER_ID: u8 = 0x7D;

/// Machine ID used when none is configured.
pub const DEFAULT_MACHINE_ID: u8 = 0x21;

/// Default cap on a single frame: a few all dumps worth.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024;

/// One complete, delimited SysEx message.
///
/// Frames are immutable once built; cloning shares the underlying buffer.
/// A `RawFrame` is not validated on construction: the assembler only ever
/// produces delimited frames, but frames built by hand may be anything and
/// the codec reports what is wrong with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawFrame {
    bytes: Bytes,
}

impl RawFrame {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Starts with `0xF0`, ends with `0xF7`, and has no other marker in between.
    pub fn is_delimited(&self) -> bool {
        let bytes = self.as_bytes();
        bytes.len() >= 2
            && bytes[0] == START
            && bytes[bytes.len() - 1] == END
            && !bytes[1..bytes.len() - 1]
                .iter()
                .any(|&b| b == START || b == END)
    }

    /// Header fields, if the frame is long enough to carry them.
    pub fn header(&self) -> Option<MessageHeader> {
        MessageHeader::parse(self.as_bytes())
    }

    /// The raw command byte, if present.
    pub fn command_byte(&self) -> Option<u8> {
        self.bytes.get(COMMAND_INDEX).copied()
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Bytes> for RawFrame {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// The fixed four-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    pub manufacturer_id: u8,
    pub machine_id: u8,
    pub device_id: u8,
}

impl MessageHeader {
    pub fn new(manufacturer_id: u8, machine_id: u8, device_id: u8) -> Self {
        Self {
            manufacturer_id,
            machine_id,
            device_id,
        }
    }

    /// Read the header from the start of a message.
    ///
    /// Returns `None` if the buffer is shorter than the header or does not
    /// begin with the start marker.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE || bytes[0] != START {
            return None;
        }
        Some(Self::new(bytes[1], bytes[2], bytes[3]))
    }

    /// Append `F0 mm kk dd`.
    pub fn write(&self, dst: &mut BytesMut) {
        dst.put_u8(START);
        dst.put_u8(self.manufacturer_id);
        dst.put_u8(self.machine_id);
        dst.put_u8(self.device_id);
    }
}

impl Default for MessageHeader {
    fn default() -> Self {
        Self::new(DEFAULT_MANUFACTURER_ID, DEFAULT_MACHINE_ID, 0)
    }
}

/// Configuration shared by the assembler and reader.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest frame accepted, markers included. Default: 4 KiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}
