//! The two 7-bit checksum variants and where each message keeps its checksum.
//!
//! Which variant a unit expects depends on its firmware revision; nothing on
//! the wire says which one is in use, so callers pass a [`ChecksumMode`].

use std::fmt;
use std::str::FromStr;

use crate::command::CommandByte;
use crate::frame::{RawFrame, COMMAND_INDEX, END, START};

/// Sum every byte (wrapping) and keep the low seven bits.
pub fn compute_mask7(payload: &[u8]) -> u8 {
    wrapping_sum(payload) & 0x7F
}

/// Two's complement of the wrapping sum, low seven bits.
///
/// `(sum(payload) + compute_complement7(payload)) & 0x7F == 0` for any input.
pub fn compute_complement7(payload: &[u8]) -> u8 {
    wrapping_sum(payload).wrapping_neg() & 0x7F
}

fn wrapping_sum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Checksum algorithm expected by the connected hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumMode {
    #[default]
    Mask7,
    Complement7,
}

impl ChecksumMode {
    pub fn compute(self, payload: &[u8]) -> u8 {
        match self {
            Self::Mask7 => compute_mask7(payload),
            Self::Complement7 => compute_complement7(payload),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mask7 => "mask7",
            Self::Complement7 => "complement7",
        }
    }
}

impl fmt::Display for ChecksumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mask7" | "mask" => Ok(Self::Mask7),
            "complement7" | "complement" => Ok(Self::Complement7),
            other => Err(format!(
                "unknown checksum mode '{other}' (expected mask7 or complement7)"
            )),
        }
    }
}

/// Byte positions covered by a checksum, and where the checksum byte sits.
///
/// Positions are absolute from the start marker; `start..end` is half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChecksumBounds {
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

impl ChecksumBounds {
    /// Single-program messages.
    pub const PROGRAM: Self = Self {
        start: 4,
        end: 34,
        index: 35,
    };

    /// All dump.
    pub const ALL_DUMP: Self = Self {
        start: 5,
        end: 590,
        index: 591,
    };

    /// Shortest message that can hold these bounds plus an end marker.
    pub fn min_len(self) -> usize {
        self.index + 2
    }

    /// The covered byte range of `bytes`. Panics if `bytes` is shorter than `end`.
    pub fn covered(self, bytes: &[u8]) -> &[u8] {
        &bytes[self.start..self.end]
    }
}

/// Why a frame failed checksum verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumError {
    /// Missing start or end marker.
    #[error("frame is not delimited by 0xF0 ... 0xF7")]
    Unterminated,

    /// Too short to hold the checksum its command calls for.
    #[error("frame too short to check ({len} bytes, need {required})")]
    TooShort { len: usize, required: usize },

    /// Command byte outside the closed set, so the bounds are unknown.
    #[error("unknown command byte {0:#04x}")]
    UnknownCommand(u8),

    /// Requests carry no checksum.
    #[error("{0} carries no checksum")]
    NotChecksummed(CommandByte),

    /// Computed and transmitted checksums disagree.
    #[error("checksum mismatch (computed {expected:#04x}, transmitted {found:#04x})")]
    Mismatch { expected: u8, found: u8 },
}

/// Verify a frame's checksum using the bounds its command byte calls for.
pub fn check(frame: &RawFrame, mode: ChecksumMode) -> Result<(), ChecksumError> {
    let bytes = frame.as_bytes();
    if bytes.len() < 2 || bytes[0] != START || bytes[bytes.len() - 1] != END {
        return Err(ChecksumError::Unterminated);
    }
    let command_byte = match frame.command_byte() {
        Some(byte) if bytes.len() > COMMAND_INDEX + 1 => byte,
        _ => {
            return Err(ChecksumError::TooShort {
                len: bytes.len(),
                required: COMMAND_INDEX + 2,
            })
        }
    };
    let command =
        CommandByte::from_byte(command_byte).ok_or(ChecksumError::UnknownCommand(command_byte))?;
    let bounds = command
        .checksum_bounds()
        .ok_or(ChecksumError::NotChecksummed(command))?;
    check_with_bounds(bytes, bounds, mode)
}

/// Verify a checksum at explicit bounds, ignoring the command byte.
pub fn check_with_bounds(
    bytes: &[u8],
    bounds: ChecksumBounds,
    mode: ChecksumMode,
) -> Result<(), ChecksumError> {
    if bytes.len() < bounds.min_len() {
        return Err(ChecksumError::TooShort {
            len: bytes.len(),
            required: bounds.min_len(),
        });
    }
    let expected = mode.compute(bounds.covered(bytes));
    let found = bytes[bounds.index];
    if expected != found {
        return Err(ChecksumError::Mismatch { expected, found });
    }
    Ok(())
}

/// `true` only for a well-formed frame whose checksum matches.
pub fn verify(frame: &RawFrame, mode: ChecksumMode) -> bool {
    check(frame, mode).is_ok()
}
