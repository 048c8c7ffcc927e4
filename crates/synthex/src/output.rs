use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;
use synthex_codec::{DecodedMessage, Program};
use synthex_hub::Event;
use synthex_transport::DeviceId;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Space-separated uppercase hex.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-line description of a decoded message.
pub fn message_summary(message: &DecodedMessage) -> String {
    let command = message.command().name();
    match message {
        DecodedMessage::ProgramDump { program_number, .. }
        | DecodedMessage::ProgramBulkDump { program_number, .. }
        | DecodedMessage::ProgramDumpRequest { program_number } => {
            format!("{command} program={program_number}")
        }
        DecodedMessage::AllDump { profile } => {
            format!("{command} programs={}", profile.programs.len())
        }
        DecodedMessage::ProgramBulkDumpRequest | DecodedMessage::AllDumpRequest => {
            command.to_string()
        }
    }
}

/// `name = value` lines, with labels for selector parameters.
pub fn program_lines(program: &Program) -> Vec<String> {
    program
        .iter()
        .map(|(id, value)| match id.spec().label(value) {
            Some(label) => format!("{id} = {value} ({label})"),
            None => format!("{id} = {value}"),
        })
        .collect()
}

pub fn print_message(device: DeviceId, message: &DecodedMessage, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&json!({
            "device": device.get(),
            "kind": "message",
            "message": message,
        })),
        OutputFormat::Table => {
            let mut table = new_table(vec!["DEVICE", "MESSAGE"]);
            table.add_row(vec![device.to_string(), message_summary(message)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("device={device} {}", message_summary(message));
            if let DecodedMessage::ProgramDump { program, .. }
            | DecodedMessage::ProgramBulkDump { program, .. } = message
            {
                for line in program_lines(program) {
                    println!("  {line}");
                }
            }
        }
    }
}

pub fn print_event(device: DeviceId, event: &Event, format: OutputFormat) {
    if let Event::Message(message) = event {
        print_message(device, message, format);
        return;
    }

    let kind = event.kind().name();
    let (detail, value) = match event {
        Event::Raw(frame) => (
            format!("{} bytes: {}", frame.len(), hex(frame.as_bytes())),
            json!({ "length": frame.len(), "bytes": hex(frame.as_bytes()) }),
        ),
        Event::DecodeFailed { frame, error } => (
            format!("decode failed: {error}"),
            json!({ "error": error.to_string(), "bytes": hex(frame.as_bytes()) }),
        ),
        Event::ParameterChange(change) => (
            format!(
                "ch={} {} = {}",
                change.channel + 1,
                change.parameter,
                change.value
            ),
            json!({
                "channel": change.channel,
                "parameter": change.parameter,
                "value": change.value,
            }),
        ),
        Event::Note(note) => (
            format!(
                "ch={} note {} {} velocity={}",
                note.channel + 1,
                note.note,
                if note.on { "on" } else { "off" },
                note.velocity
            ),
            json!({
                "channel": note.channel,
                "note": note.note,
                "velocity": note.velocity,
                "on": note.on,
            }),
        ),
        Event::Message(_) => return,
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "device": device.get(),
            "kind": kind,
            "event": value,
        })),
        OutputFormat::Table => {
            let mut table = new_table(vec!["DEVICE", "KIND", "DETAIL"]);
            table.add_row(vec![device.to_string(), kind.to_string(), detail]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("device={device} {kind} {detail}"),
    }
}
