//! Encoding and decoding of complete protocol messages.
//!
//! ```text
//! Program dump:  F0 mm kk dd 00 pp <29 params> cs F7
//! Program req:   F0 mm kk dd 40 pp F7
//! All dump:      F0 mm kk dd 08 <20 x 29 params> <6 globals> cs F7
//! All dump req:  F0 mm kk dd 48 F7
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use synthex_frame::{
    check_with_bounds, ChecksumBounds, ChecksumError, CommandByte, RawFrame, ALL_DUMP_PROGRAM_START,
    COMMAND_INDEX, END, GLOBAL_COUNT, GLOBAL_START, PARAMETER_COUNT, PARAMETER_START,
    PROGRAM_COUNT, PROGRAM_NUMBER_INDEX, START,
};

use crate::cc::controller_for;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::globals::GlobalSettings;
use crate::params::ParameterId;
use crate::program::{check_program_number, DeviceProfile, Program};

/// Status nibble of a MIDI control-change message.
pub const CONTROL_CHANGE: u8 = 0xB0;

/// A decoded message: a dump with its structured contents, or a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodedMessage {
    ProgramDump { program_number: u8, program: Program },
    ProgramBulkDump { program_number: u8, program: Program },
    AllDump { profile: Box<DeviceProfile> },
    ProgramDumpRequest { program_number: u8 },
    ProgramBulkDumpRequest,
    AllDumpRequest,
}

impl DecodedMessage {
    pub fn command(&self) -> CommandByte {
        match self {
            Self::ProgramDump { .. } => CommandByte::ProgramDump,
            Self::ProgramBulkDump { .. } => CommandByte::ProgramBulkDump,
            Self::AllDump { .. } => CommandByte::AllDump,
            Self::ProgramDumpRequest { .. } => CommandByte::ProgramDumpRequest,
            Self::ProgramBulkDumpRequest => CommandByte::ProgramBulkDumpRequest,
            Self::AllDumpRequest => CommandByte::AllDumpRequest,
        }
    }

    pub fn is_request(&self) -> bool {
        self.command().is_request()
    }
}

/// Encode a single-program dump.
pub fn encode_program_dump(
    program: &Program,
    program_number: u8,
    config: &CodecConfig,
) -> Result<Bytes> {
    encode_single(CommandByte::ProgramDump, program, program_number, config)
}

/// Encode a program dump answering a bulk request.
pub fn encode_program_bulk_dump(
    program: &Program,
    program_number: u8,
    config: &CodecConfig,
) -> Result<Bytes> {
    encode_single(CommandByte::ProgramBulkDump, program, program_number, config)
}

fn encode_single(
    command: CommandByte,
    program: &Program,
    program_number: u8,
    config: &CodecConfig,
) -> Result<Bytes> {
    let program_number = check_program_number(program_number)?;
    let mut buf = BytesMut::with_capacity(command.expected_len());
    config.header().write(&mut buf);
    buf.put_u8(command.as_byte());
    buf.put_u8(program_number);
    buf.put_slice(&program.to_bytes());
    Ok(seal(buf, ChecksumBounds::PROGRAM, config))
}

/// Encode all 20 programs and the global settings.
pub fn encode_all_dump(profile: &DeviceProfile, config: &CodecConfig) -> Bytes {
    let command = CommandByte::AllDump;
    let mut buf = BytesMut::with_capacity(command.expected_len());
    config.header().write(&mut buf);
    buf.put_u8(command.as_byte());
    debug_assert_eq!(buf.len(), ALL_DUMP_PROGRAM_START);
    for program in &profile.programs {
        buf.put_slice(&program.to_bytes());
    }
    buf.put_slice(&profile.globals.to_bytes());
    seal(buf, ChecksumBounds::ALL_DUMP, config)
}

/// Append checksum and end marker. `buf` must end right before the checksum.
fn seal(mut buf: BytesMut, bounds: ChecksumBounds, config: &CodecConfig) -> Bytes {
    debug_assert_eq!(buf.len(), bounds.index);
    let checksum = config.checksum_mode.compute(bounds.covered(&buf));
    buf.put_u8(checksum);
    buf.put_u8(END);
    buf.freeze()
}

/// Ask the device for one program.
pub fn encode_program_request(program_number: u8, config: &CodecConfig) -> Result<Bytes> {
    let program_number = check_program_number(program_number)?;
    let mut buf = BytesMut::with_capacity(CommandByte::ProgramDumpRequest.expected_len());
    config.header().write(&mut buf);
    buf.put_u8(CommandByte::ProgramDumpRequest.as_byte());
    buf.put_u8(program_number);
    buf.put_u8(END);
    Ok(buf.freeze())
}

/// Ask the device to stream every program as separate dumps.
pub fn encode_bulk_request(config: &CodecConfig) -> Bytes {
    encode_short_request(CommandByte::ProgramBulkDumpRequest, config)
}

/// Ask the device for an all dump.
pub fn encode_all_dump_request(config: &CodecConfig) -> Bytes {
    encode_short_request(CommandByte::AllDumpRequest, config)
}

fn encode_short_request(command: CommandByte, config: &CodecConfig) -> Bytes {
    let mut buf = BytesMut::with_capacity(command.expected_len());
    config.header().write(&mut buf);
    buf.put_u8(command.as_byte());
    buf.put_u8(END);
    buf.freeze()
}

/// Real-time control change setting `parameter` to `value` on `channel`.
pub fn encode_parameter_change(channel: u8, parameter: ParameterId, value: u8) -> Result<[u8; 3]> {
    if channel > 0x0F {
        return Err(CodecError::InvalidChannel(channel));
    }
    let spec = parameter.spec();
    if !spec.contains(value) {
        return Err(CodecError::ParameterOutOfRange {
            name: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok([CONTROL_CHANGE | channel, controller_for(parameter), value])
}

/// Decode and validate a complete frame against the connected device.
///
/// Checks run in wire order: markers, header, command, length, checksum,
/// parameter ranges. The first failure is returned.
pub fn decode(frame: &RawFrame, config: &CodecConfig) -> Result<DecodedMessage> {
    let bytes = frame.as_bytes();
    if bytes.len() < COMMAND_INDEX + 2 {
        return Err(CodecError::MalformedFrame(format!(
            "{} bytes is shorter than header and command",
            bytes.len()
        )));
    }
    if bytes[0] != START {
        return Err(CodecError::MalformedFrame(format!(
            "expected start marker, found {:#04x}",
            bytes[0]
        )));
    }
    let last = bytes[bytes.len() - 1];
    if last != END {
        return Err(CodecError::MalformedFrame(format!(
            "expected end marker, found {last:#04x}"
        )));
    }

    check_header(bytes, config)?;

    let command_byte = bytes[COMMAND_INDEX];
    let command =
        CommandByte::from_byte(command_byte).ok_or(CodecError::UnknownCommand(command_byte))?;

    if bytes.len() != command.expected_len() {
        return Err(CodecError::MalformedFrame(format!(
            "{command} must be {} bytes, got {}",
            command.expected_len(),
            bytes.len()
        )));
    }

    if let Some(bounds) = command.checksum_bounds() {
        check_with_bounds(bytes, bounds, config.checksum_mode).map_err(|err| match err {
            ChecksumError::Mismatch { expected, found } => {
                CodecError::InvalidChecksum { expected, found }
            }
            other => CodecError::MalformedFrame(other.to_string()),
        })?;
    }

    match command {
        CommandByte::ProgramDump | CommandByte::ProgramBulkDump => {
            let program_number = check_program_number(bytes[PROGRAM_NUMBER_INDEX])?;
            let program = Program::from_bytes(
                &bytes[PARAMETER_START..PARAMETER_START + PARAMETER_COUNT],
            )?;
            Ok(if command == CommandByte::ProgramDump {
                DecodedMessage::ProgramDump {
                    program_number,
                    program,
                }
            } else {
                DecodedMessage::ProgramBulkDump {
                    program_number,
                    program,
                }
            })
        }
        CommandByte::AllDump => {
            let mut profile = DeviceProfile::new();
            let programs = &bytes[ALL_DUMP_PROGRAM_START..GLOBAL_START];
            for (slot, chunk) in profile
                .programs
                .iter_mut()
                .zip(programs.chunks_exact(PARAMETER_COUNT))
            {
                *slot = Program::from_bytes(chunk)?;
            }
            debug_assert_eq!(programs.len(), PROGRAM_COUNT * PARAMETER_COUNT);
            profile.globals =
                GlobalSettings::from_bytes(&bytes[GLOBAL_START..GLOBAL_START + GLOBAL_COUNT])?;
            Ok(DecodedMessage::AllDump {
                profile: Box::new(profile),
            })
        }
        CommandByte::ProgramDumpRequest => Ok(DecodedMessage::ProgramDumpRequest {
            program_number: check_program_number(bytes[PROGRAM_NUMBER_INDEX])?,
        }),
        CommandByte::ProgramBulkDumpRequest => Ok(DecodedMessage::ProgramBulkDumpRequest),
        CommandByte::AllDumpRequest => Ok(DecodedMessage::AllDumpRequest),
    }
}

fn check_header(bytes: &[u8], config: &CodecConfig) -> Result<()> {
    let (manufacturer_id, machine_id, device_id) = (bytes[1], bytes[2], bytes[3]);
    if manufacturer_id != config.manufacturer_id {
        return Err(CodecError::WrongManufacturerId {
            expected: config.manufacturer_id,
            found: manufacturer_id,
        });
    }
    if machine_id != config.machine_id {
        return Err(CodecError::WrongMachineId {
            expected: config.machine_id,
            found: machine_id,
        });
    }
    if device_id != config.device_id.get() {
        return Err(CodecError::WrongDeviceId {
            expected: config.device_id.get(),
            found: device_id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use synthex_frame::{ChecksumMode, ALL_DUMP_LEN, PROGRAM_DUMP_LEN};
    use synthex_transport::DeviceId;

    use super::*;
    use crate::globals::GlobalId;

    fn config() -> CodecConfig {
        CodecConfig::new(DeviceId::new(3).unwrap())
    }

    fn frame(bytes: impl Into<Bytes>) -> RawFrame {
        RawFrame::new(bytes)
    }

    /// Rewrite a program-dump byte and fix up the checksum.
    fn patch_program_dump(bytes: &[u8], index: usize, value: u8, mode: ChecksumMode) -> Vec<u8> {
        let mut patched = bytes.to_vec();
        patched[index] = value;
        let bounds = ChecksumBounds::PROGRAM;
        patched[bounds.index] = mode.compute(bounds.covered(&patched));
        patched
    }

    #[test]
    fn program_dump_layout() {
        let cfg = config();
        let program = Program::new().with(ParameterId::Env1Attack, 5).unwrap();
        let bytes = encode_program_dump(&program, 7, &cfg).unwrap();

        assert_eq!(bytes.len(), PROGRAM_DUMP_LEN);
        assert_eq!(&bytes[..6], &[START, 0x7D, 0x21, 3, 0x00, 7]);
        assert_eq!(bytes[6], 5);
        assert_eq!(&bytes[6..35], &program.to_bytes());
        assert_eq!(bytes[35], ChecksumMode::Mask7.compute(&bytes[4..34]));
        assert_eq!(bytes[36], END);
    }

    #[test]
    fn program_dump_roundtrip() {
        let cfg = config().with_checksum_mode(ChecksumMode::Complement7);
        let program = Program::new()
            .with(ParameterId::LfoShape, 3)
            .and_then(|p| p.with(ParameterId::Mod5Source, 15))
            .unwrap();
        let bytes = encode_program_dump(&program, 19, &cfg).unwrap();

        let decoded = decode(&frame(bytes), &cfg).unwrap();
        assert_eq!(
            decoded,
            DecodedMessage::ProgramDump {
                program_number: 19,
                program
            }
        );
        assert!(!decoded.is_request());
    }

    #[test]
    fn bulk_dump_uses_program_layout() {
        let cfg = config();
        let bytes = encode_program_bulk_dump(&Program::new(), 2, &cfg).unwrap();
        assert_eq!(bytes.len(), PROGRAM_DUMP_LEN);
        assert_eq!(bytes[COMMAND_INDEX], 0x01);
        assert!(matches!(
            decode(&frame(bytes), &cfg).unwrap(),
            DecodedMessage::ProgramBulkDump { program_number: 2, .. }
        ));
    }

    #[test]
    fn all_dump_layout_and_roundtrip() {
        let cfg = config();
        let mut profile = DeviceProfile::new();
        profile
            .program_mut(0)
            .unwrap()
            .set(ParameterId::Cutoff, 1)
            .unwrap();
        profile
            .program_mut(19)
            .unwrap()
            .set(ParameterId::TriggerMode, 1)
            .unwrap();
        profile.globals.set(GlobalId::MasterTune, 70).unwrap();

        let bytes = encode_all_dump(&profile, &cfg);
        assert_eq!(bytes.len(), ALL_DUMP_LEN);
        assert_eq!(bytes[COMMAND_INDEX], 0x08);
        assert_eq!(bytes[ALL_DUMP_PROGRAM_START + ParameterId::Cutoff.index()], 1);
        assert_eq!(bytes[ALL_DUMP_PROGRAM_START + 19 * PARAMETER_COUNT + 28], 1);
        assert_eq!(bytes[590], 70);
        assert_eq!(bytes[591], ChecksumMode::Mask7.compute(&bytes[5..590]));
        assert_eq!(bytes[592], END);

        let decoded = decode(&frame(bytes), &cfg).unwrap();
        assert_eq!(
            decoded,
            DecodedMessage::AllDump {
                profile: Box::new(profile)
            }
        );
    }

    #[test]
    fn requests() {
        let cfg = config();

        let program = encode_program_request(4, &cfg).unwrap();
        assert_eq!(program.as_ref(), &[START, 0x7D, 0x21, 3, 0x40, 4, END]);
        assert_eq!(
            decode(&frame(program), &cfg).unwrap(),
            DecodedMessage::ProgramDumpRequest { program_number: 4 }
        );

        let bulk = encode_bulk_request(&cfg);
        assert_eq!(bulk.as_ref(), &[START, 0x7D, 0x21, 3, 0x41, END]);
        assert_eq!(
            decode(&frame(bulk), &cfg).unwrap(),
            DecodedMessage::ProgramBulkDumpRequest
        );

        let all = encode_all_dump_request(&cfg);
        assert_eq!(all.as_ref(), &[START, 0x7D, 0x21, 3, 0x48, END]);
        let decoded = decode(&frame(all), &cfg).unwrap();
        assert_eq!(decoded, DecodedMessage::AllDumpRequest);
        assert!(decoded.is_request());
    }

    #[test]
    fn program_number_out_of_range() {
        let cfg = config();
        assert_eq!(
            encode_program_dump(&Program::new(), 20, &cfg).unwrap_err(),
            CodecError::ProgramNumberOutOfRange(20)
        );
        assert!(encode_program_request(127, &cfg).is_err());

        let bytes = encode_program_dump(&Program::new(), 0, &cfg).unwrap();
        let patched = patch_program_dump(&bytes, PROGRAM_NUMBER_INDEX, 25, cfg.checksum_mode);
        assert_eq!(
            decode(&frame(patched), &cfg).unwrap_err(),
            CodecError::ProgramNumberOutOfRange(25)
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        let cfg = config();
        let err = decode(&frame(vec![START, 0x7D, 0x21, 3, 0x20, 0, END]), &cfg).unwrap_err();
        assert_eq!(err, CodecError::UnknownCommand(0x20));
    }

    #[test]
    fn out_of_range_lfo_shape_with_valid_checksum() {
        let cfg = config();
        let bytes = encode_program_dump(&Program::new(), 0, &cfg).unwrap();
        let patched = patch_program_dump(
            &bytes,
            ParameterId::LfoShape.offset(),
            7,
            cfg.checksum_mode,
        );

        let err = decode(&frame(patched), &cfg).unwrap_err();
        assert_eq!(
            err,
            CodecError::ParameterOutOfRange {
                name: "lfo_shape",
                value: 7,
                min: 0,
                max: 4
            }
        );
    }

    #[test]
    fn corrupted_checksum() {
        let cfg = config();
        let mut bytes = encode_program_dump(&Program::new(), 0, &cfg).unwrap().to_vec();
        bytes[10] ^= 0x01;
        assert!(matches!(
            decode(&frame(bytes), &cfg),
            Err(CodecError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn wrong_checksum_mode_is_detected() {
        let bytes = encode_program_dump(&Program::new(), 0, &config()).unwrap();
        let cfg = config().with_checksum_mode(ChecksumMode::Complement7);
        assert!(matches!(
            decode(&frame(bytes), &cfg),
            Err(CodecError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn header_mismatches() {
        let cfg = config();
        let request = encode_all_dump_request(&cfg);

        let other_device = config().with_device_id(DeviceId::new(4).unwrap());
        assert_eq!(
            decode(&frame(request.clone()), &other_device).unwrap_err(),
            CodecError::WrongDeviceId {
                expected: 4,
                found: 3
            }
        );

        let other_machine = config().with_machine_id(0x22);
        assert!(matches!(
            decode(&frame(request.clone()), &other_machine),
            Err(CodecError::WrongMachineId { .. })
        ));

        let other_vendor = config().with_manufacturer_id(0x41);
        assert!(matches!(
            decode(&frame(request), &other_vendor),
            Err(CodecError::WrongManufacturerId {
                expected: 0x41,
                found: 0x7D
            })
        ));
    }

    #[test]
    fn malformed_frames() {
        let cfg = config();
        for bytes in [
            vec![],
            vec![START, END],
            vec![START, 0x7D, 0x21, 3, 0x48],
            vec![0x00, 0x7D, 0x21, 3, 0x48, END],
            vec![START, 0x7D, 0x21, 3, 0x48, 0x00, END],
            vec![START, 0x7D, 0x21, 3, 0x00, 0, 0, END],
        ] {
            assert!(
                matches!(
                    decode(&frame(bytes.clone()), &cfg),
                    Err(CodecError::MalformedFrame(_))
                ),
                "{bytes:02x?}"
            );
        }
    }

    #[test]
    fn parameter_change_messages() {
        assert_eq!(
            encode_parameter_change(0, ParameterId::Cutoff, 100).unwrap(),
            [0xB0, 74, 100]
        );
        assert_eq!(
            encode_parameter_change(15, ParameterId::Mod4Source, 2).unwrap(),
            [0xBF, 0x2B, 2]
        );
        assert_eq!(
            encode_parameter_change(16, ParameterId::Cutoff, 1).unwrap_err(),
            CodecError::InvalidChannel(16)
        );
        assert!(matches!(
            encode_parameter_change(0, ParameterId::TriggerSource, 3),
            Err(CodecError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn decoded_messages_serialize_with_type_tag() {
        let json = serde_json::to_value(DecodedMessage::ProgramDumpRequest { program_number: 2 })
            .unwrap();
        assert_eq!(json["type"], "program_dump_request");
        assert_eq!(json["program_number"], 2);
    }
}
