use std::fmt;

use crate::checksum::ChecksumBounds;
use crate::frame::{ALL_DUMP_LEN, PROGRAM_DUMP_LEN, PROGRAM_REQUEST_LEN, SHORT_REQUEST_LEN};

/// Bit that marks a command as a request.
pub const REQUEST_BIT: u8 = 0x40;

/// The closed set of command bytes the instrument understands.
///
/// Every request is its response with [`REQUEST_BIT`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CommandByte {
    ProgramDump = 0x00,
    ProgramBulkDump = 0x01,
    AllDump = 0x08,
    ProgramDumpRequest = 0x40,
    ProgramBulkDumpRequest = 0x41,
    AllDumpRequest = 0x48,
}

impl CommandByte {
    pub const ALL: [CommandByte; 6] = [
        CommandByte::ProgramDump,
        CommandByte::ProgramBulkDump,
        CommandByte::AllDump,
        CommandByte::ProgramDumpRequest,
        CommandByte::ProgramBulkDumpRequest,
        CommandByte::AllDumpRequest,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::ProgramDump),
            0x01 => Some(Self::ProgramBulkDump),
            0x08 => Some(Self::AllDump),
            0x40 => Some(Self::ProgramDumpRequest),
            0x41 => Some(Self::ProgramBulkDumpRequest),
            0x48 => Some(Self::AllDumpRequest),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Request/response discrimination from the byte alone.
    pub fn is_request_byte(byte: u8) -> bool {
        byte & REQUEST_BIT == REQUEST_BIT
    }

    pub fn is_request(self) -> bool {
        Self::is_request_byte(self.as_byte())
    }

    /// The dump a request asks for, or the dump itself.
    pub fn response(self) -> Self {
        match self {
            Self::ProgramDump | Self::ProgramDumpRequest => Self::ProgramDump,
            Self::ProgramBulkDump | Self::ProgramBulkDumpRequest => Self::ProgramBulkDump,
            Self::AllDump | Self::AllDumpRequest => Self::AllDump,
        }
    }

    /// The request that produces this dump, or the request itself.
    pub fn request(self) -> Self {
        match self.response() {
            Self::ProgramDump => Self::ProgramDumpRequest,
            Self::ProgramBulkDump => Self::ProgramBulkDumpRequest,
            _ => Self::AllDumpRequest,
        }
    }

    /// Where the checksum lives. Requests carry none.
    pub fn checksum_bounds(self) -> Option<ChecksumBounds> {
        match self {
            Self::AllDump => Some(ChecksumBounds::ALL_DUMP),
            Self::ProgramDump | Self::ProgramBulkDump => Some(ChecksumBounds::PROGRAM),
            _ => None,
        }
    }

    /// Whether the message carries a program number after the command byte.
    pub fn has_program_number(self) -> bool {
        matches!(
            self,
            Self::ProgramDump | Self::ProgramBulkDump | Self::ProgramDumpRequest
        )
    }

    /// Exact wire length, markers included.
    pub fn expected_len(self) -> usize {
        match self {
            Self::ProgramDump | Self::ProgramBulkDump => PROGRAM_DUMP_LEN,
            Self::AllDump => ALL_DUMP_LEN,
            Self::ProgramDumpRequest => PROGRAM_REQUEST_LEN,
            Self::ProgramBulkDumpRequest | Self::AllDumpRequest => SHORT_REQUEST_LEN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ProgramDump => "program-dump",
            Self::ProgramBulkDump => "program-bulk-dump",
            Self::AllDump => "all-dump",
            Self::ProgramDumpRequest => "program-dump-request",
            Self::ProgramBulkDumpRequest => "program-bulk-dump-request",
            Self::AllDumpRequest => "all-dump-request",
        }
    }
}

impl TryFrom<u8> for CommandByte {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Self::from_byte(byte).ok_or(byte)
    }
}

impl fmt::Display for CommandByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.as_byte())
    }
}
