use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use synthex_codec::CodecConfig;
use synthex_frame::ChecksumMode;
use synthex_hub::{ConnectionCoordinator, EventKind};
use synthex_transport::{DeviceId, PortConfig, DEFAULT_CLIENT_NAME};
use tracing::{debug, warn};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod checksum;
pub mod inspect;
pub mod monitor;
pub mod params;
pub mod ports;
pub mod request;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode every SysEx frame in a .syx file.
    Inspect(InspectArgs),
    /// Compute both checksum variants over a byte sequence.
    Checksum(ChecksumArgs),
    /// Print the parameter, controller and global tables.
    Params(ParamsArgs),
    /// Ask the device for a program, every program, or an all dump.
    Request(RequestArgs),
    /// Send the frames of a .syx file to the device.
    Send(SendArgs),
    /// Print decoded traffic from a MIDI port or a capture file.
    Monitor(MonitorArgs),
    /// List the MIDI ports visible to this host.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, device: &DeviceOpts) -> CliResult<i32> {
    match command {
        Command::Inspect(args) => inspect::run(args, format, device.codec_config()?),
        Command::Checksum(args) => checksum::run(args, format),
        Command::Params(args) => params::run(args, format),
        Command::Request(args) => request::run(args, format, device.codec_config()?),
        Command::Send(args) => send::run(args, format, device.codec_config()?),
        Command::Monitor(args) => monitor::run(args, format, device.codec_config()?),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Identity of the target device, shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct DeviceOpts {
    /// Device id (0-126, decimal or 0x-prefixed hex).
    #[arg(
        long,
        value_name = "ID",
        default_value = "0",
        value_parser = parse_byte,
        env = "SYNTHEX_DEVICE_ID",
        global = true
    )]
    pub device_id: u8,

    /// Checksum variant expected by the hardware (mask7 or complement7).
    #[arg(
        long,
        value_name = "MODE",
        default_value = "mask7",
        env = "SYNTHEX_CHECKSUM",
        global = true
    )]
    pub checksum: ChecksumMode,

    /// Manufacturer id byte.
    #[arg(long, value_name = "ID", default_value = "0x7D", value_parser = parse_byte, global = true)]
    pub manufacturer_id: u8,

    /// Machine id byte.
    #[arg(long, value_name = "ID", default_value = "0x21", value_parser = parse_byte, global = true)]
    pub machine_id: u8,
}

impl DeviceOpts {
    pub fn device(&self) -> CliResult<DeviceId> {
        DeviceId::new(self.device_id).map_err(|err| transport_error("--device-id", err))
    }

    pub fn codec_config(&self) -> CliResult<CodecConfig> {
        Ok(CodecConfig::new(self.device()?)
            .with_checksum_mode(self.checksum)
            .with_manufacturer_id(self.manufacturer_id)
            .with_machine_id(self.machine_id))
    }
}

/// Parse `125`, `0x7D` or `7Dh` into a 7-bit byte.
pub fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .or_else(|| input.strip_suffix('h'))
    {
        u8::from_str_radix(hex, 16)
    } else {
        input.parse::<u8>()
    };
    match parsed {
        Ok(value) if value <= 0x7F => Ok(value),
        Ok(value) => Err(format!("{value} is not a 7-bit value")),
        Err(err) => Err(format!("invalid byte '{input}': {err}")),
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Feed everything read from `source` into the coordinator on a background
/// thread. The device is disconnected at EOF so subscribers see the end.
pub fn spawn_reader<R>(
    mut source: R,
    coordinator: Arc<ConnectionCoordinator>,
    device: DeviceId,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 256];
        loop {
            match source.read(&mut buf) {
                Ok(0) => {
                    debug!(%device, "reached end of input");
                    break;
                }
                Ok(n) => {
                    coordinator.push_bytes(device, &buf[..n]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(%device, error = %err, "read failed");
                    break;
                }
            }
        }
        coordinator.disconnect(device);
    })
}

#[derive(Args, Debug)]
pub struct PortOpts {
    /// Pause after each message sent, in milliseconds (0 disables).
    #[arg(long, default_value_t = 10)]
    pub message_delay_ms: u64,
    /// Client name registered with the MIDI system.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CLIENT_NAME)]
    pub client_name: String,
}

impl PortOpts {
    pub fn port_config(&self) -> PortConfig {
        PortConfig {
            client_name: self.client_name.clone(),
            message_delay: (self.message_delay_ms > 0)
                .then(|| Duration::from_millis(self.message_delay_ms)),
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// .syx file to read.
    pub file: PathBuf,
    /// Accept frames addressed to any device id.
    #[arg(long)]
    pub any_device: bool,
    /// List every parameter of decoded programs (pretty output).
    #[arg(long)]
    pub params: bool,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Bytes to sum, hex by default ("40 64 7F", "40647F" or "0x40").
    #[arg(required = true, num_args = 1..)]
    pub bytes: Vec<String>,
    /// Read values as decimal instead of hex.
    #[arg(long)]
    pub decimal: bool,
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Show the global settings table instead.
    #[arg(long)]
    pub globals: bool,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// MIDI port, by index or name fragment (see `synthex ports`).
    pub port: String,
    /// Program to request (0-19).
    #[arg(long, conflicts_with_all = ["all", "bulk"])]
    pub program: Option<u8>,
    /// Request an all dump.
    #[arg(long, conflicts_with_all = ["program", "bulk"])]
    pub all: bool,
    /// Request every program as separate dumps.
    #[arg(long, conflicts_with_all = ["program", "all"])]
    pub bulk: bool,
    /// Wait for the response and print it.
    #[arg(long)]
    pub wait: bool,
    /// How long to wait for the response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Write received dumps to a .syx file (implies --wait).
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Print the request instead of opening the port.
    #[arg(long)]
    pub dry_run: bool,
    #[command(flatten)]
    pub port_opts: PortOpts,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// MIDI output port, by index or name fragment.
    pub port: String,
    /// .syx file whose frames are sent.
    pub file: PathBuf,
    /// Send frames even if they fail to decode.
    #[arg(long)]
    pub no_verify: bool,
    /// Rewrite each frame's device id to --device-id.
    #[arg(long)]
    pub retarget: bool,
    /// Print what would be sent instead of opening the port.
    #[arg(long)]
    pub dry_run: bool,
    #[command(flatten)]
    pub port_opts: PortOpts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Raw,
    Message,
    ParameterChange,
    Note,
}

impl From<KindArg> for EventKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Raw => EventKind::Raw,
            KindArg::Message => EventKind::Message,
            KindArg::ParameterChange => EventKind::ParameterChange,
            KindArg::Note => EventKind::Note,
        }
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// MIDI input port, by index or name fragment.
    #[arg(required_unless_present = "replay", conflicts_with = "replay")]
    pub port: Option<String>,
    /// Decode a file of captured MIDI bytes instead of a live port.
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,
    /// Client name registered with the MIDI system.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CLIENT_NAME)]
    pub client_name: String,
    /// Streams to show (comma-separated).
    #[arg(
        long,
        value_delimiter = ',',
        default_values = ["message", "parameter-change", "note"]
    )]
    pub kind: Vec<KindArg>,
    /// Exit after N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    /// Client name registered with the MIDI system.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CLIENT_NAME)]
    pub client_name: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_byte_accepts_decimal_and_hex() {
        assert_eq!(parse_byte("125"), Ok(125));
        assert_eq!(parse_byte("0x7D"), Ok(0x7D));
        assert_eq!(parse_byte("21h"), Ok(0x21));
        assert!(parse_byte("0x80").is_err());
        assert!(parse_byte("zz").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn port_opts_zero_delay_disables_pause() {
        let opts = PortOpts {
            message_delay_ms: 0,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        };
        let config = opts.port_config();
        assert_eq!(config.client_name, "synthex");
        assert!(config.message_delay.is_none());

        let opts = PortOpts {
            message_delay_ms: 25,
            client_name: "librarian".to_string(),
        };
        assert_eq!(opts.port_config().message_delay, Some(Duration::from_millis(25)));
    }
}
