use std::fmt;

use crate::error::{Result, TransportError};

/// SysEx device ID of a connected synthesizer (0-126).
///
/// This is also the key the coordinator uses for per-device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u8);

impl DeviceId {
    /// Highest legal device ID.
    pub const MAX: u8 = 0x7E;

    /// Validate and wrap a raw device ID.
    pub fn new(raw: u8) -> Result<Self> {
        if raw > Self::MAX {
            return Err(TransportError::InvalidDeviceId(raw));
        }
        Ok(Self(raw))
    }

    /// The wire value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self(0)
    }
}

impl TryFrom<u8> for DeviceId {
    type Error = TransportError;

    fn try_from(raw: u8) -> Result<Self> {
        Self::new(raw)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}
