use synthex_frame::{ChecksumMode, MessageHeader, DEFAULT_MACHINE_ID, DEFAULT_MANUFACTURER_ID};
use synthex_transport::DeviceId;

/// Per-device settings passed to every encode and decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub manufacturer_id: u8,
    pub machine_id: u8,
    pub device_id: DeviceId,
    /// Which checksum variant the connected hardware revision expects.
    pub checksum_mode: ChecksumMode,
}

impl CodecConfig {
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            ..Self::default()
        }
    }

    pub fn with_device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_checksum_mode(mut self, mode: ChecksumMode) -> Self {
        self.checksum_mode = mode;
        self
    }

    pub fn with_manufacturer_id(mut self, id: u8) -> Self {
        self.manufacturer_id = id;
        self
    }

    pub fn with_machine_id(mut self, id: u8) -> Self {
        self.machine_id = id;
        self
    }

    /// Header every outbound message starts with.
    pub fn header(&self) -> MessageHeader {
        MessageHeader::new(self.manufacturer_id, self.machine_id, self.device_id.get())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: DEFAULT_MANUFACTURER_ID,
            machine_id: DEFAULT_MACHINE_ID,
            device_id: DeviceId::default(),
            checksum_mode: ChecksumMode::default(),
        }
    }
}
