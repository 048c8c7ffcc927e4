use crate::device::DeviceId;

/// Errors surfaced from the MIDI transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The platform MIDI API could not be initialised.
    #[error("midi backend unavailable: {0}")]
    Init(String),

    /// No port name matched the selector.
    #[error("no midi port matches '{selector}' (available: {})", display_names(.available))]
    PortNotFound {
        selector: String,
        available: Vec<String>,
    },

    /// The port exists but refused the connection.
    #[error("failed to connect to midi port '{port}': {message}")]
    Connect { port: String, message: String },

    /// The driver rejected an outbound message.
    #[error("failed to send to midi port '{port}': {message}")]
    Send { port: String, message: String },

    /// The device went away.
    #[error("device {0} disconnected")]
    Disconnected(DeviceId),

    /// No outbound sink is attached for this device.
    #[error("no output attached for device {0}")]
    NoOutput(DeviceId),

    /// Device IDs are 7-bit and 0x7F is reserved.
    #[error("invalid device id {0:#04x} (expected 0x00..=0x7e)")]
    InvalidDeviceId(u8),
}

fn display_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
