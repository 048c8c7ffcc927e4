use std::fs::File;
use std::io::BufReader;

use serde::Serialize;
use synthex_codec::{decode, CodecConfig, DecodedMessage};
use synthex_frame::{check, ChecksumError, FrameReader, RawFrame};
use synthex_transport::DeviceId;

use crate::cmd::InspectArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{message_summary, new_table, print_json, program_lines, OutputFormat};

#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub length: usize,
    pub device_id: Option<u8>,
    pub command: Option<&'static str>,
    pub checksum: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<DecodedMessage>,
}

impl FrameReport {
    pub fn build(index: usize, frame: &RawFrame, config: &CodecConfig) -> Self {
        let command = frame
            .command_byte()
            .and_then(synthex_frame::CommandByte::from_byte);
        let checksum = match check(frame, config.checksum_mode) {
            Ok(()) => "ok",
            Err(ChecksumError::NotChecksummed(_)) => "-",
            Err(ChecksumError::Mismatch { .. }) => "mismatch",
            Err(_) => "invalid",
        };
        let (message, error) = match decode(frame, config) {
            Ok(message) => (Some(message), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            index,
            length: frame.len(),
            device_id: frame.header().map(|header| header.device_id),
            command: command.map(|command| command.name()),
            checksum,
            ok: error.is_none(),
            error,
            message,
        }
    }

    fn result(&self) -> String {
        match (&self.message, &self.error) {
            (Some(message), _) => message_summary(message),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        }
    }
}

pub fn run(args: InspectArgs, format: OutputFormat, config: CodecConfig) -> CliResult<i32> {
    let file = File::open(&args.file)
        .map_err(|err| io_error(&format!("failed opening {}", args.file.display()), err))?;
    let frames = FrameReader::new(BufReader::new(file))
        .read_all()
        .map_err(|err| frame_error("read failed", err))?;

    let reports: Vec<FrameReport> = frames
        .iter()
        .enumerate()
        .map(|(index, frame)| {
            let config = if args.any_device {
                retarget_config(frame, config)
            } else {
                config
            };
            FrameReport::build(index, frame, &config)
        })
        .collect();

    print_reports(&reports, format, args.params);

    let failed = reports.iter().filter(|report| !report.ok).count();
    if failed > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{failed} of {} frames failed to decode", reports.len()),
        ));
    }
    if reports.is_empty() {
        tracing::warn!(file = %args.file.display(), "no SysEx frames found");
    }
    Ok(SUCCESS)
}

/// Decode against whatever device the frame names.
fn retarget_config(frame: &RawFrame, config: CodecConfig) -> CodecConfig {
    frame
        .header()
        .and_then(|header| DeviceId::new(header.device_id).ok())
        .map(|device| config.with_device_id(device))
        .unwrap_or(config)
}

fn print_reports(reports: &[FrameReport], format: OutputFormat, params: bool) {
    match format {
        OutputFormat::Json => {
            for report in reports {
                print_json(report);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "COMMAND", "DEVICE", "BYTES", "CHECKSUM", "RESULT"]);
            for report in reports {
                table.add_row(vec![
                    report.index.to_string(),
                    report.command.unwrap_or("?").to_string(),
                    report
                        .device_id
                        .map(|id| format!("{id:#04x}"))
                        .unwrap_or_else(|| "-".to_string()),
                    report.length.to_string(),
                    report.checksum.to_string(),
                    report.result(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for report in reports {
                println!(
                    "#{} {} ({} bytes) checksum={} {}",
                    report.index,
                    report.command.unwrap_or("?"),
                    report.length,
                    report.checksum,
                    report.result()
                );
                if !params {
                    continue;
                }
                match &report.message {
                    Some(DecodedMessage::ProgramDump { program, .. })
                    | Some(DecodedMessage::ProgramBulkDump { program, .. }) => {
                        for line in program_lines(program) {
                            println!("  {line}");
                        }
                    }
                    Some(DecodedMessage::AllDump { profile }) => {
                        for (number, program) in profile.programs.iter().enumerate() {
                            println!("  program {number}:");
                            for line in program_lines(program) {
                                println!("    {line}");
                            }
                        }
                        for (id, value) in profile.globals.iter() {
                            println!("  {id} = {value}");
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
