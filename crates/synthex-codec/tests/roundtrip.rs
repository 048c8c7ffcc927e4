use proptest::prelude::*;
use synthex_codec::{
    decode, encode_all_dump, encode_program_dump, CodecConfig, DecodedMessage, DeviceProfile,
    GlobalId, GlobalSettings, ParameterId, Program, PARAMETERS,
};
use synthex_frame::{verify, ChecksumBounds, ChecksumMode, RawFrame};
use synthex_transport::DeviceId;

fn program_strategy() -> impl Strategy<Value = Program> {
    (prop::array::uniform29(any::<u8>()), any::<u32>()).prop_map(|(raw, mask)| {
        let mut program = Program::new();
        for (i, spec) in PARAMETERS.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            let span = u16::from(spec.max - spec.min) + 1;
            let value = spec.min + (u16::from(raw[i]) % span) as u8;
            program.set(spec.id, value).unwrap();
        }
        program
    })
}

fn config_strategy() -> impl Strategy<Value = CodecConfig> {
    (0u8..=0x7E, any::<bool>()).prop_map(|(device, complement)| {
        let mode = if complement {
            ChecksumMode::Complement7
        } else {
            ChecksumMode::Mask7
        };
        CodecConfig::new(DeviceId::new(device).unwrap()).with_checksum_mode(mode)
    })
}

proptest! {
    #[test]
    fn program_dump_roundtrips(
        program in program_strategy(),
        number in 0u8..20,
        config in config_strategy(),
    ) {
        let bytes = encode_program_dump(&program, number, &config).unwrap();
        let frame = RawFrame::new(bytes);
        prop_assert!(frame.is_delimited());
        prop_assert!(verify(&frame, config.checksum_mode));

        let decoded = decode(&frame, &config).unwrap();
        prop_assert_eq!(
            decoded,
            DecodedMessage::ProgramDump { program_number: number, program }
        );
    }

    #[test]
    fn all_dump_roundtrips(
        programs in prop::collection::vec(program_strategy(), 20),
        tune in 0u8..=127,
        config in config_strategy(),
    ) {
        let mut profile = DeviceProfile::new();
        for (number, program) in programs.into_iter().enumerate() {
            profile.set_program(number as u8, program).unwrap();
        }
        let mut globals = GlobalSettings::default();
        globals.set(GlobalId::MasterTune, tune).unwrap();
        profile.globals = globals;

        let frame = RawFrame::new(encode_all_dump(&profile, &config));
        let decoded = decode(&frame, &config).unwrap();
        prop_assert_eq!(decoded, DecodedMessage::AllDump { profile: Box::new(profile) });
    }

    #[test]
    fn json_roundtrips(program in program_strategy()) {
        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, program);
    }
}

#[test]
fn swapped_bounds_fail_on_valid_messages() {
    let config = CodecConfig::default();
    let program = Program::new().with(ParameterId::Cutoff, 3).unwrap();
    let single = encode_program_dump(&program, 1, &config).unwrap();
    let all = encode_all_dump(&DeviceProfile::new(), &config);

    let mode = config.checksum_mode;
    assert!(synthex_frame::check_with_bounds(&single, ChecksumBounds::PROGRAM, mode).is_ok());
    assert!(synthex_frame::check_with_bounds(&all, ChecksumBounds::ALL_DUMP, mode).is_ok());
    assert!(synthex_frame::check_with_bounds(&single, ChecksumBounds::ALL_DUMP, mode).is_err());
    assert!(synthex_frame::check_with_bounds(&all, ChecksumBounds::PROGRAM, mode).is_err());
}
