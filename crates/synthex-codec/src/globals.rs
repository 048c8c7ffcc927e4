//! Device-wide settings carried at the tail of an all dump.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use synthex_frame::{GLOBAL_COUNT, GLOBAL_START};

use crate::error::{CodecError, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GlobalId {
    MidiChannel,
    LocalControl,
    ClockSource,
    VelocityCurve,
    Transpose,
    MasterTune,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalSpec {
    pub id: GlobalId,
    pub name: &'static str,
    /// Absolute byte offset inside an all dump.
    pub offset: usize,
    pub min: u8,
    pub max: u8,
    pub default: u8,
}

impl GlobalSpec {
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

const fn global(
    id: GlobalId,
    name: &'static str,
    index: usize,
    max: u8,
    default: u8,
) -> GlobalSpec {
    GlobalSpec {
        id,
        name,
        offset: GLOBAL_START + index,
        min: 0,
        max,
        default,
    }
}

/// Global settings table, offsets 585..=590.
pub const GLOBALS: [GlobalSpec; GLOBAL_COUNT] = [
    global(GlobalId::MidiChannel, "midi_channel", 0, 15, 0),
    global(GlobalId::LocalControl, "local_control", 1, 1, 1),
    global(GlobalId::ClockSource, "clock_source", 2, 2, 0),
    global(GlobalId::VelocityCurve, "velocity_curve", 3, 3, 0),
    // Semitones, 24 is no transposition.
    global(GlobalId::Transpose, "transpose", 4, 48, 24),
    global(GlobalId::MasterTune, "master_tune", 5, 127, 64),
];

impl GlobalId {
    pub const ALL: [GlobalId; GLOBAL_COUNT] = [
        GlobalId::MidiChannel,
        GlobalId::LocalControl,
        GlobalId::ClockSource,
        GlobalId::VelocityCurve,
        GlobalId::Transpose,
        GlobalId::MasterTune,
    ];

    pub fn spec(self) -> &'static GlobalSpec {
        &GLOBALS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The six global bytes of a device profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<GlobalId, u8>",
    try_from = "BTreeMap<GlobalId, u8>"
)]
pub struct GlobalSettings {
    values: [u8; GLOBAL_COUNT],
}

impl GlobalSettings {
    pub fn get(&self, id: GlobalId) -> u8 {
        self.values[id as usize]
    }

    pub fn set(&mut self, id: GlobalId, value: u8) -> Result<()> {
        let spec = id.spec();
        if !spec.contains(value) {
            return Err(out_of_range(spec, value));
        }
        self.values[id as usize] = value;
        Ok(())
    }

    /// Validate and adopt the global bytes of an all dump.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != GLOBAL_COUNT {
            return Err(CodecError::MalformedFrame(format!(
                "expected {GLOBAL_COUNT} global bytes, got {}",
                bytes.len()
            )));
        }
        let mut values = [0u8; GLOBAL_COUNT];
        for (spec, (&value, slot)) in GLOBALS.iter().zip(bytes.iter().zip(values.iter_mut())) {
            if !spec.contains(value) {
                return Err(out_of_range(spec, value));
            }
            *slot = value;
        }
        Ok(Self { values })
    }

    pub fn to_bytes(&self) -> [u8; GLOBAL_COUNT] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlobalId, u8)> + '_ {
        GlobalId::ALL.into_iter().map(|id| (id, self.get(id)))
    }
}

impl Default for GlobalSettings {
    fn default() -> Self {
        let mut values = [0u8; GLOBAL_COUNT];
        for (slot, spec) in values.iter_mut().zip(GLOBALS.iter()) {
            *slot = spec.default;
        }
        Self { values }
    }
}

impl From<GlobalSettings> for BTreeMap<GlobalId, u8> {
    fn from(settings: GlobalSettings) -> Self {
        settings.iter().collect()
    }
}

impl TryFrom<BTreeMap<GlobalId, u8>> for GlobalSettings {
    type Error = CodecError;

    fn try_from(map: BTreeMap<GlobalId, u8>) -> Result<Self> {
        let mut settings = Self::default();
        for (id, value) in map {
            settings.set(id, value)?;
        }
        Ok(settings)
    }
}

fn out_of_range(spec: &GlobalSpec, value: u8) -> CodecError {
    CodecError::ParameterOutOfRange {
        name: spec.name,
        value,
        min: spec.min,
        max: spec.max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_layout() {
        for (i, spec) in GLOBALS.iter().enumerate() {
            assert_eq!(spec.offset, 585 + i);
            assert_eq!(spec.id as usize, i);
            assert!(spec.contains(spec.default));
        }
    }

    #[test]
    fn defaults() {
        let globals = GlobalSettings::default();
        assert_eq!(globals.get(GlobalId::LocalControl), 1);
        assert_eq!(globals.get(GlobalId::Transpose), 24);
    }

    #[test]
    fn set_rejects_out_of_range() {
        let mut globals = GlobalSettings::default();
        globals.set(GlobalId::MidiChannel, 15).unwrap();
        let err = globals.set(GlobalId::MidiChannel, 16).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ParameterOutOfRange { name: "midi_channel", value: 16, .. }
        ));
        assert_eq!(globals.get(GlobalId::MidiChannel), 15);
    }

    #[test]
    fn from_bytes_validates_each_byte() {
        let ok = GlobalSettings::from_bytes(&[3, 0, 2, 1, 30, 70]).unwrap();
        assert_eq!(ok.to_bytes(), [3, 0, 2, 1, 30, 70]);

        let err = GlobalSettings::from_bytes(&[3, 2, 2, 1, 30, 70]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ParameterOutOfRange { name: "local_control", .. }
        ));
        assert!(matches!(
            GlobalSettings::from_bytes(&[0; 5]),
            Err(CodecError::MalformedFrame(_))
        ));
    }

    #[test]
    fn serde_uses_names_and_validates() {
        let mut globals = GlobalSettings::default();
        globals.set(GlobalId::ClockSource, 2).unwrap();
        let json = serde_json::to_value(globals).unwrap();
        assert_eq!(json["clock_source"], 2);
        assert_eq!(json["master_tune"], 64);

        let back: GlobalSettings = serde_json::from_value(json).unwrap();
        assert_eq!(back, globals);

        let bad = serde_json::from_str::<GlobalSettings>(r#"{"velocity_curve": 9}"#);
        assert!(bad.is_err());
    }
}
