//! SysEx protocol toolkit for a hardware synthesizer.
//!
//! synthex reassembles the synth's System-Exclusive traffic from an
//! arbitrarily fragmented MIDI byte stream, validates and decodes program
//! and all-dump messages, and fans the results out to concurrent
//! subscribers.
//!
//! # Crate Structure
//!
//! - [`transport`]: MIDI transport boundary (device ids, raw ports, outbound sinks)
//! - [`frame`]: wire layer (markers, command bytes, checksums, stream assembly)
//! - [`codec`]: parameter tables and program/all-dump encode/decode
//! - [`hub`]: per-device coordinator and subscriber fan-out (behind `hub` feature)

/// Re-export transport types.
pub mod transport {
    pub use synthex_transport::*;
}

/// Re-export wire-layer types.
pub mod frame {
    pub use synthex_frame::*;
}

/// Re-export codec types.
pub mod codec {
    pub use synthex_codec::*;
}

/// Re-export hub types (requires `hub` feature).
#[cfg(feature = "hub")]
pub mod hub {
    pub use synthex_hub::*;
}
