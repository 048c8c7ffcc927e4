//! MIDI transport boundary.
//!
//! The hardware driver is an external collaborator. This crate only defines
//! the seam the rest of synthex talks to:
//! - inbound raw bytes arrive as plain `&[u8]` chunks (see `synthex-hub`)
//! - outbound buffers go through the [`MidiOutput`] trait
//!
//! With the `midi` feature, [`PortInput`] and [`PortOutput`] bind that seam
//! to the platform MIDI API (ALSA, CoreMIDI, WinMM) through `midir`.

pub mod device;
pub mod error;
#[cfg(feature = "midi")]
pub mod midi;
pub mod output;

pub use device::DeviceId;
pub use error::{Result, TransportError};
#[cfg(feature = "midi")]
pub use midi::{
    list_ports, select_port, PortConfig, PortInput, PortList, PortOutput, DEFAULT_CLIENT_NAME,
};
pub use output::{MemoryOutput, MidiOutput};
