use std::sync::Mutex;

use bytes::Bytes;

use crate::device::DeviceId;
use crate::error::Result;

/// Outbound half of the transport boundary.
///
/// Implementations hand a complete buffer to the driver. They must not
/// block on anything other than the driver itself.
pub trait MidiOutput: Send + Sync {
    /// Transmit `bytes` to `device`.
    fn send(&self, device: DeviceId, bytes: &[u8]) -> Result<()>;
}

/// Records every outbound buffer in memory.
///
/// Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    sent: Mutex<Vec<(DeviceId, Bytes)>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(DeviceId, Bytes)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Buffers sent to one device, in order.
    pub fn sent_to(&self, device: DeviceId) -> Vec<Bytes> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == device)
            .map(|(_, bytes)| bytes)
            .collect()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        match self.sent.lock() {
            Ok(mut sent) => sent.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl MidiOutput for MemoryOutput {
    fn send(&self, device: DeviceId, bytes: &[u8]) -> Result<()> {
        let entry = (device, Bytes::copy_from_slice(bytes));
        match self.sent.lock() {
            Ok(mut sent) => sent.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order_per_device() {
        let out = MemoryOutput::new();
        let a = DeviceId::new(1).unwrap();
        let b = DeviceId::new(2).unwrap();

        out.send(a, &[0xF0, 0xF7]).unwrap();
        out.send(b, &[0x90, 60, 100]).unwrap();
        out.send(a, &[0xB0, 7, 100]).unwrap();

        assert_eq!(out.sent().len(), 3);
        let to_a = out.sent_to(a);
        assert_eq!(to_a.len(), 2);
        assert_eq!(to_a[0].as_ref(), &[0xF0, 0xF7]);
        assert_eq!(to_a[1].as_ref(), &[0xB0, 7, 100]);

        out.clear();
        assert!(out.sent().is_empty());
    }

    #[test]
    fn usable_as_trait_object() {
        let out: std::sync::Arc<dyn MidiOutput> = std::sync::Arc::new(MemoryOutput::new());
        out.send(DeviceId::default(), &[0xF8]).unwrap();
    }
}
