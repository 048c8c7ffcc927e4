use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutputConnection};
use tracing::{debug, info};

use crate::device::DeviceId;
use crate::error::{Result, TransportError};
use crate::output::MidiOutput;

/// Client name registered with the platform MIDI API.
pub const DEFAULT_CLIENT_NAME: &str = "synthex";

/// How ports are opened and paced.
#[derive(Debug, Clone)]
pub struct PortConfig {
    pub client_name: String,
    /// Pause after each outbound message. Interfaces drop bytes when dumps
    /// are written back to back.
    pub message_delay: Option<Duration>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            message_delay: Some(Duration::from_millis(10)),
        }
    }
}

/// Port names currently visible to the MIDI API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortList {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

pub fn list_ports(client_name: &str) -> Result<PortList> {
    let input = MidiInput::new(client_name).map_err(|err| TransportError::Init(err.to_string()))?;
    let output =
        midir::MidiOutput::new(client_name).map_err(|err| TransportError::Init(err.to_string()))?;
    Ok(PortList {
        inputs: input
            .ports()
            .iter()
            .map(|port| input.port_name(port).unwrap_or_default())
            .collect(),
        outputs: output
            .ports()
            .iter()
            .map(|port| output.port_name(port).unwrap_or_default())
            .collect(),
    })
}

/// Pick a port by index (`"1"`) or by case-insensitive name fragment.
pub fn select_port(names: &[String], selector: &str) -> Option<usize> {
    let selector = selector.trim();
    if let Ok(index) = selector.parse::<usize>() {
        if index < names.len() {
            return Some(index);
        }
    }
    let needle = selector.to_lowercase();
    if needle.is_empty() {
        return None;
    }
    names
        .iter()
        .position(|name| name.to_lowercase() == needle)
        .or_else(|| {
            names
                .iter()
                .position(|name| name.to_lowercase().contains(&needle))
        })
}

fn not_found(selector: &str, available: Vec<String>) -> TransportError {
    TransportError::PortNotFound {
        selector: selector.to_string(),
        available,
    }
}

/// Outbound connection to one MIDI port.
///
/// One port is one physical cable, so the device ID is only used for logging.
pub struct PortOutput {
    connection: Mutex<MidiOutputConnection>,
    name: String,
    config: PortConfig,
}

impl PortOutput {
    pub fn connect(selector: &str, config: PortConfig) -> Result<Self> {
        let midi = midir::MidiOutput::new(&config.client_name)
            .map_err(|err| TransportError::Init(err.to_string()))?;
        let ports = midi.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|port| midi.port_name(port).unwrap_or_default())
            .collect();
        let index = select_port(&names, selector).ok_or_else(|| not_found(selector, names.clone()))?;
        let name = names[index].clone();

        let connection = midi
            .connect(&ports[index], &format!("{}-out", config.client_name))
            .map_err(|err| TransportError::Connect {
                port: name.clone(),
                message: err.to_string(),
            })?;
        info!(port = %name, "midi output connected");
        Ok(Self {
            connection: Mutex::new(connection),
            name,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }
}

impl MidiOutput for PortOutput {
    fn send(&self, device: DeviceId, bytes: &[u8]) -> Result<()> {
        let mut connection = match self.connection.lock() {
            Ok(connection) => connection,
            Err(poisoned) => poisoned.into_inner(),
        };
        connection
            .send(bytes)
            .map_err(|err| TransportError::Send {
                port: self.name.clone(),
                message: err.to_string(),
            })?;
        if let Some(delay) = self.config.message_delay {
            std::thread::sleep(delay);
        }
        debug!(%device, port = %self.name, size = bytes.len(), "sent message");
        Ok(())
    }
}

impl fmt::Debug for PortOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortOutput")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

/// Inbound connection to one MIDI port.
///
/// Every packet the driver delivers is handed to the callback on the
/// driver's thread. Timing clock and active sensing are filtered out by the
/// driver; SysEx is passed through. Dropping the value disconnects.
pub struct PortInput {
    connection: MidiInputConnection<()>,
    name: String,
}

impl PortInput {
    pub fn connect<F>(selector: &str, config: &PortConfig, mut on_bytes: F) -> Result<Self>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let mut midi = MidiInput::new(&config.client_name)
            .map_err(|err| TransportError::Init(err.to_string()))?;
        midi.ignore(Ignore::TimeAndActiveSense);
        let ports = midi.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|port| midi.port_name(port).unwrap_or_default())
            .collect();
        let index = select_port(&names, selector).ok_or_else(|| not_found(selector, names.clone()))?;
        let name = names[index].clone();

        let connection = midi
            .connect(
                &ports[index],
                &format!("{}-in", config.client_name),
                move |_stamp, bytes, _| on_bytes(bytes),
                (),
            )
            .map_err(|err| TransportError::Connect {
                port: name.clone(),
                message: err.to_string(),
            })?;
        info!(port = %name, "midi input connected");
        Ok(Self { connection, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop delivery. Bytes already handed to the callback are unaffected.
    pub fn close(self) {
        let _ = self.connection.close();
        debug!(port = %self.name, "midi input closed");
    }
}

impl fmt::Debug for PortInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortInput").field("name", &self.name).finish()
    }
}
