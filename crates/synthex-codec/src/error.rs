/// Errors produced while encoding or decoding protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Missing or misplaced marker, or wrong length for the command.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("wrong manufacturer id (expected {expected:#04x}, found {found:#04x})")]
    WrongManufacturerId { expected: u8, found: u8 },

    #[error("wrong machine id (expected {expected:#04x}, found {found:#04x})")]
    WrongMachineId { expected: u8, found: u8 },

    #[error("wrong device id (expected {expected:#04x}, found {found:#04x})")]
    WrongDeviceId { expected: u8, found: u8 },

    /// Command byte outside the closed set.
    #[error("unknown command byte {0:#04x}")]
    UnknownCommand(u8),

    #[error("invalid checksum (computed {expected:#04x}, transmitted {found:#04x})")]
    InvalidChecksum { expected: u8, found: u8 },

    /// A parameter or global byte outside its declared range.
    #[error("{name} value {value} outside {min}..={max}")]
    ParameterOutOfRange {
        name: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },

    /// Program numbers run 0..20.
    #[error("program number {0} out of range (0-19)")]
    ProgramNumberOutOfRange(u8),

    /// MIDI channels run 0..16.
    #[error("midi channel {0} out of range (0-15)")]
    InvalidChannel(u8),
}

pub type Result<T> = std::result::Result<T, CodecError>;
