use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::json;
use synthex_codec::{
    encode_all_dump, encode_all_dump_request, encode_bulk_request, encode_program_bulk_dump,
    encode_program_dump, encode_program_request, CodecConfig, CodecError, DecodedMessage,
};
use synthex_frame::{CommandByte, PROGRAM_COUNT};
use synthex_hub::{ConnectionCoordinator, Event, EventKind, Subscription};
use synthex_transport::{MemoryOutput, PortInput, PortOutput};
use tracing::{debug, warn};

use crate::cmd::{parse_duration, RequestArgs};
use crate::exit::{
    codec_error, hub_error, io_error, transport_error, CliError, CliResult, DATA_INVALID, FAILURE,
    SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{hex, print_json, print_message, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Program(u8),
    Bulk,
    All,
}

impl Target {
    fn from_args(args: &RequestArgs) -> CliResult<Self> {
        match (args.program, args.bulk, args.all) {
            (Some(number), false, false) => Ok(Self::Program(number)),
            (None, true, false) => Ok(Self::Bulk),
            (None, false, true) => Ok(Self::All),
            _ => Err(CliError::new(
                USAGE,
                "exactly one of --program, --bulk or --all is required",
            )),
        }
    }

    fn command(self) -> CommandByte {
        match self {
            Self::Program(_) => CommandByte::ProgramDumpRequest,
            Self::Bulk => CommandByte::ProgramBulkDumpRequest,
            Self::All => CommandByte::AllDumpRequest,
        }
    }

    /// Number of dumps the device answers with.
    fn expected_responses(self) -> usize {
        match self {
            Self::Bulk => PROGRAM_COUNT,
            _ => 1,
        }
    }

    fn encode(self, config: &CodecConfig) -> CliResult<Bytes> {
        match self {
            Self::Program(number) => encode_program_request(number, config)
                .map_err(|err| codec_error("--program", err)),
            Self::Bulk => Ok(encode_bulk_request(config)),
            Self::All => Ok(encode_all_dump_request(config)),
        }
    }
}

pub fn run(args: RequestArgs, format: OutputFormat, config: CodecConfig) -> CliResult<i32> {
    let target = Target::from_args(&args)?;
    let request = target.encode(&config)?;
    let device = config.device_id;

    if args.dry_run {
        let output = Arc::new(MemoryOutput::new());
        let coordinator = ConnectionCoordinator::new().with_output(output.clone());
        coordinator.connect(config);
        coordinator
            .send(device, &request)
            .map_err(|err| hub_error("send failed", err))?;
        for bytes in output.sent_to(device) {
            print_request(device.get(), target.command(), &bytes, format);
        }
        return Ok(SUCCESS);
    }

    let timeout = parse_duration(&args.timeout)?;
    let wait = args.wait || args.out.is_some();

    let port_config = args.port_opts.port_config();
    let output = PortOutput::connect(&args.port, port_config.clone())
        .map_err(|err| transport_error(&format!("failed opening '{}'", args.port), err))?;
    let coordinator = Arc::new(ConnectionCoordinator::new().with_output(Arc::new(output)));
    coordinator.connect(config);

    // Subscribe and listen before sending so a fast reply is not missed.
    let subscription = wait.then(|| coordinator.subscribe(device, EventKind::Message));
    let input = match &subscription {
        Some(_) => {
            let inbound = Arc::clone(&coordinator);
            let input = PortInput::connect(&args.port, &port_config, move |bytes| {
                inbound.push_bytes(device, bytes);
            })
            .map_err(|err| transport_error(&format!("failed listening on '{}'", args.port), err))?;
            Some(input)
        }
        None => None,
    };

    coordinator
        .send(device, &request)
        .map_err(|err| hub_error("send failed", err))?;
    debug!(%device, request = target.command().name(), "request sent");

    let Some(subscription) = subscription else {
        print_request(device.get(), target.command(), &request, format);
        return Ok(SUCCESS);
    };

    let collected = collect_responses(&subscription, target, timeout);
    if let Some(input) = input {
        input.close();
    }
    let messages = collected?;
    for message in &messages {
        print_message(device, message, format);
    }

    if let Some(path) = &args.out {
        let bytes = encode_responses(&messages, &config)?;
        fs::write(path, &bytes)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        debug!(path = %path.display(), len = bytes.len(), "dumps written");
    }

    Ok(SUCCESS)
}

fn print_request(device: u8, command: CommandByte, bytes: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&json!({
            "device": device,
            "request": command.name(),
            "bytes": hex(bytes),
        })),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", hex(bytes)),
    }
}

/// Wait for the dumps answering `target`.
///
/// Messages for other programs, repeated program numbers and frames meant
/// for another device or command are skipped. A response that fails to
/// decode ends the wait.
fn collect_responses(
    subscription: &Subscription,
    target: Target,
    timeout: Duration,
) -> CliResult<Vec<DecodedMessage>> {
    let expected = target.expected_responses();
    let response = target.command().response();
    let deadline = Instant::now() + timeout;
    let mut messages = Vec::with_capacity(expected);
    let mut seen = BTreeSet::new();

    while messages.len() < expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CliError::new(
                TIMEOUT,
                format!(
                    "timed out after {} of {expected} {} messages",
                    messages.len(),
                    response.name()
                ),
            ));
        }
        match subscription.recv_timeout(remaining) {
            Some(Event::Message(message)) if message.command() == response => {
                if !matches_target(&message, target) {
                    debug!(message = ?message.command(), "ignoring dump for another program");
                    continue;
                }
                if let Some(number) = program_number(&message) {
                    if !seen.insert(number) {
                        debug!(program = number, "ignoring repeated dump");
                        continue;
                    }
                }
                messages.push((*message).clone());
            }
            Some(Event::Message(message)) => {
                debug!(command = message.command().name(), "ignoring unrelated message");
            }
            Some(Event::DecodeFailed { error, .. }) if addressed_elsewhere(&error) => {
                debug!(%error, "ignoring frame for another device");
            }
            Some(Event::DecodeFailed { frame, error })
                if frame.command_byte().and_then(CommandByte::from_byte) != Some(response) =>
            {
                debug!(%error, command = ?frame.command_byte(), "ignoring unrelated bad frame");
            }
            Some(Event::DecodeFailed { error, .. }) => {
                return Err(CliError::new(
                    DATA_INVALID,
                    format!("response failed to decode: {error}"),
                ));
            }
            Some(other) => warn!(kind = %other.kind(), "unexpected event kind"),
            None if subscription.is_cancelled() => {
                return Err(CliError::new(
                    FAILURE,
                    "port closed before the response arrived",
                ));
            }
            None => {}
        }
    }
    Ok(messages)
}

fn addressed_elsewhere(error: &CodecError) -> bool {
    matches!(
        error,
        CodecError::WrongDeviceId { .. }
            | CodecError::WrongManufacturerId { .. }
            | CodecError::WrongMachineId { .. }
    )
}

fn program_number(message: &DecodedMessage) -> Option<u8> {
    match message {
        DecodedMessage::ProgramDump { program_number, .. }
        | DecodedMessage::ProgramBulkDump { program_number, .. } => Some(*program_number),
        _ => None,
    }
}

fn matches_target(message: &DecodedMessage, target: Target) -> bool {
    match (target, message) {
        (Target::Program(wanted), DecodedMessage::ProgramDump { program_number, .. }) => {
            *program_number == wanted
        }
        _ => true,
    }
}

fn encode_responses(messages: &[DecodedMessage], config: &CodecConfig) -> CliResult<Bytes> {
    let mut buf = BytesMut::new();
    for message in messages {
        let bytes = match message {
            DecodedMessage::ProgramDump {
                program_number,
                program,
            } => encode_program_dump(program, *program_number, config),
            DecodedMessage::ProgramBulkDump {
                program_number,
                program,
            } => encode_program_bulk_dump(program, *program_number, config),
            DecodedMessage::AllDump { profile } => Ok(encode_all_dump(profile, config)),
            _ => continue,
        }
        .map_err(|err| codec_error("re-encode failed", err))?;
        buf.put_slice(&bytes);
    }
    Ok(buf.freeze())
}
