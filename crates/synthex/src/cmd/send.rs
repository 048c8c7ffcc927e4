use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use serde::Serialize;
use synthex_codec::{decode, CodecConfig};
use synthex_frame::{CommandByte, FrameReader, RawFrame, HEADER_SIZE};
use synthex_hub::ConnectionCoordinator;
use synthex_transport::{MemoryOutput, MidiOutput, PortOutput};
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{
    frame_error, hub_error, io_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS,
};
use crate::output::{hex, new_table, print_json, OutputFormat};

const DEVICE_ID_INDEX: usize = HEADER_SIZE - 1;

#[derive(Debug, Serialize)]
struct SendReport {
    index: usize,
    command: Option<&'static str>,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<String>,
}

pub fn run(args: SendArgs, format: OutputFormat, config: CodecConfig) -> CliResult<i32> {
    let file = File::open(&args.file)
        .map_err(|err| io_error(&format!("failed opening {}", args.file.display()), err))?;
    let mut frames = FrameReader::new(BufReader::new(file))
        .read_all()
        .map_err(|err| frame_error("read failed", err))?;
    if frames.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no SysEx frames in {}", args.file.display()),
        ));
    }

    if args.retarget {
        frames = frames
            .iter()
            .map(|frame| retarget(frame, config.device_id.get()))
            .collect();
    }
    if !args.no_verify {
        verify_all(&frames, &config)?;
    }

    let device = config.device_id;
    let memory = args.dry_run.then(|| Arc::new(MemoryOutput::new()));
    let output: Arc<dyn MidiOutput> = match &memory {
        Some(memory) => memory.clone() as Arc<dyn MidiOutput>,
        None => {
            let port = PortOutput::connect(&args.port, args.port_opts.port_config())
                .map_err(|err| transport_error(&format!("failed opening '{}'", args.port), err))?;
            Arc::new(port)
        }
    };
    let coordinator = ConnectionCoordinator::new().with_output(output);
    coordinator.connect(config);

    let mut reports = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        coordinator
            .send(device, frame.as_bytes())
            .map_err(|err| hub_error(&format!("frame {index}: send failed"), err))?;
        reports.push(SendReport {
            index,
            command: frame
                .command_byte()
                .and_then(CommandByte::from_byte)
                .map(CommandByte::name),
            length: frame.len(),
            bytes: None,
        });
    }

    if let Some(memory) = memory {
        for (report, bytes) in reports.iter_mut().zip(memory.sent_to(device)) {
            report.bytes = Some(hex(&bytes));
        }
    } else {
        info!(%device, frames = reports.len(), "frames sent");
    }

    print_reports(&reports, format);
    Ok(SUCCESS)
}

/// Rewrite the device id byte. It sits outside every checksum range.
fn retarget(frame: &RawFrame, device_id: u8) -> RawFrame {
    let mut bytes = frame.as_bytes().to_vec();
    if bytes.len() > DEVICE_ID_INDEX + 1 {
        bytes[DEVICE_ID_INDEX] = device_id;
    }
    RawFrame::new(bytes)
}

fn verify_all(frames: &[RawFrame], config: &CodecConfig) -> CliResult<()> {
    for (index, frame) in frames.iter().enumerate() {
        decode(frame, config).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("frame {index} failed verification: {err} (use --no-verify to send anyway)"),
            )
        })?;
    }
    Ok(())
}

fn print_reports(reports: &[SendReport], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for report in reports {
                print_json(report);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "COMMAND", "BYTES"]);
            for report in reports {
                table.add_row(vec![
                    report.index.to_string(),
                    report.command.unwrap_or("?").to_string(),
                    report.length.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for report in reports {
                match &report.bytes {
                    Some(bytes) => println!("#{} {bytes}", report.index),
                    None => println!(
                        "#{} sent {} ({} bytes)",
                        report.index,
                        report.command.unwrap_or("?"),
                        report.length
                    ),
                }
            }
        }
    }
}
