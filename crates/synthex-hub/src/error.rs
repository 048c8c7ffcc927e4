use synthex_transport::DeviceId;

/// Errors that can occur in hub and coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] synthex_transport::TransportError),

    /// Encoding an outbound message failed.
    #[error("codec error: {0}")]
    Codec(#[from] synthex_codec::CodecError),

    /// The device has no session.
    #[error("device {0} is not connected")]
    NotConnected(DeviceId),
}

pub type Result<T> = std::result::Result<T, HubError>;
