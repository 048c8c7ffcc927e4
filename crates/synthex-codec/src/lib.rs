//! Structured encode/decode for the synthex SysEx protocol.
//!
//! [`params::PARAMETERS`] and [`globals::GLOBALS`] describe every byte of a
//! dump. The codec walks those tables to turn a [`Program`] or
//! [`DeviceProfile`] into a wire message and back, validating header,
//! command, checksum and every parameter range on the way in.
//!
//! All device-specific settings travel in an explicit [`CodecConfig`].

pub mod cc;
pub mod codec;
pub mod config;
pub mod error;
pub mod globals;
pub mod params;
pub mod program;

pub use cc::{controller_for, parameter_for, CONTROLLERS};
pub use codec::{
    decode, encode_all_dump, encode_all_dump_request, encode_bulk_request,
    encode_parameter_change, encode_program_bulk_dump, encode_program_dump,
    encode_program_request, DecodedMessage, CONTROL_CHANGE,
};
pub use config::CodecConfig;
pub use error::{CodecError, Result};
pub use globals::{GlobalId, GlobalSettings, GlobalSpec, GLOBALS};
pub use params::{
    ParameterId, ParameterKind, ParameterSpec, LFO_SHAPES, MOD_SOURCES, PARAMETERS,
    TRIGGER_MODES, TRIGGER_SOURCES,
};
pub use program::{check_program_number, DeviceProfile, Program};
