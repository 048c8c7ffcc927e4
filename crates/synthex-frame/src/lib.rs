//! SysEx wire layer for the synthex stack.
//!
//! Every message on the wire is delimited by `0xF0` ... `0xF7` and starts
//! with a fixed header:
//! - start marker `0xF0`
//! - manufacturer ID
//! - machine ID
//! - device ID (0-126)
//!
//! followed by a command byte. This crate knows where the checksum lives for
//! each command, how to compute both checksum variants, and how to carve an
//! arbitrarily fragmented byte stream back into complete frames. It does not
//! know what the parameter bytes mean; that is `synthex-codec`.

pub mod assembler;
pub mod checksum;
#[cfg(feature = "async")]
pub mod codec;
pub mod command;
pub mod error;
pub mod frame;
pub mod reader;

pub use assembler::{AssemblerState, StreamAssembler};
pub use checksum::{
    check, check_with_bounds, compute_complement7, compute_mask7, verify, ChecksumBounds,
    ChecksumError, ChecksumMode,
};
#[cfg(feature = "async")]
pub use codec::SysexCodec;
pub use command::{CommandByte, REQUEST_BIT};
pub use error::{FrameError, Result};
pub use frame::{
    FrameConfig, MessageHeader, RawFrame, ALL_DUMP_LEN, ALL_DUMP_PROGRAM_START, COMMAND_INDEX,
    DEFAULT_MACHINE_ID, DEFAULT_MANUFACTURER_ID, DEFAULT_MAX_FRAME_SIZE, END, GLOBAL_COUNT,
    GLOBAL_START, HEADER_SIZE, PARAMETER_COUNT, PARAMETER_START, PROGRAM_COUNT, PROGRAM_DUMP_LEN,
    PROGRAM_NUMBER_INDEX, PROGRAM_REQUEST_LEN, SHORT_REQUEST_LEN, START,
};
pub use reader::FrameReader;
