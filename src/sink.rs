use crate::error::{Error, Result};

use pcap::{Active, Capture};

const SNAPSHOT_LEN: i32 = 1024;
const READ_TIMEOUT_MS: i32 = 30_000;

/// Where finished frames go
pub trait PacketSink {
    /// Delivers one frame. Any error is fatal to the transmission.
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// A short name for logs
    fn name(&self) -> &str;
}

/// Injects frames on a live device through libpcap. The handle is closed when the sink is
/// dropped, whatever the exit path.
pub struct PcapSink {
    device: String,
    capture: Capture<Active>,
}

impl PcapSink {
    pub fn open(device: &str) -> Result<Self> {
        let capture = Capture::from_device(device)
            .and_then(|c| {
                c.snaplen(SNAPSHOT_LEN)
                    .promisc(false)
                    .timeout(READ_TIMEOUT_MS)
                    .open()
            })
            .map_err(|source| Error::DeviceOpen {
                device: device.to_string(),
                source,
            })?;
        log::info!("Device {device} opened");
        Ok(PcapSink {
            device: device.to_string(),
            capture,
        })
    }
}

impl PacketSink for PcapSink {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.capture.sendpacket(frame).map_err(|e| Error::Send {
            device: self.device.clone(),
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.device
    }
}

impl Drop for PcapSink {
    fn drop(&mut self) {
        log::debug!("Device {} closed", self.device);
    }
}

/// Keeps every frame in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Vec<u8>>,
    /// Fail on the send with this index (0-based)
    pub fail_at: Option<usize>,
}

#[cfg(test)]
impl PacketSink for MemorySink {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.fail_at == Some(self.frames.len()) {
            return Err(Error::Send {
                device: "memory".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
