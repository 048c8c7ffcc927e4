//! The program parameter table.
//!
//! Every program carries 29 parameter bytes at absolute offsets 6..=34 of a
//! program dump. [`PARAMETERS`] is the single place where offsets, legal
//! ranges and defaults are declared; encode and decode both walk it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use synthex_frame::{PARAMETER_COUNT, PARAMETER_START};

/// How a parameter's byte is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Plain 0-127 slider.
    Amount,
    /// Index into [`MOD_SOURCES`].
    ModSource,
    /// Small closed set of choices (LFO shape, trigger source, trigger mode).
    Contained,
}

/// Logical identifier of a program parameter, in dump order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ParameterId {
    Env1Attack,
    Env1Decay,
    Env1Sustain,
    Env1Release,
    Env2Attack,
    Env2Decay,
    Env2Sustain,
    Env2Release,
    LfoRate,
    LfoShape,
    LfoDepth,
    LfoDelay,
    Mod1Amount,
    Mod1Source,
    Mod2Amount,
    Mod2Source,
    Mod3Amount,
    Mod3Source,
    Mod4Amount,
    Mod4Source,
    Mod5Amount,
    Mod5Source,
    Cutoff,
    Resonance,
    Volume,
    Panning,
    GateTime,
    TriggerSource,
    TriggerMode,
}

/// One row of the parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub id: ParameterId,
    pub name: &'static str,
    /// Absolute byte offset inside a program dump.
    pub offset: usize,
    pub min: u8,
    pub max: u8,
    pub default: u8,
    pub kind: ParameterKind,
    /// Display names for selector values, empty for amounts.
    pub labels: &'static [&'static str],
}

impl ParameterSpec {
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Display name of `value`, if this parameter selects from a fixed set.
    pub fn label(&self, value: u8) -> Option<&'static str> {
        self.labels.get(usize::from(value)).copied()
    }
}

/// Modulation sources selectable by the `modN_source` parameters.
pub const MOD_SOURCES: [&str; 16] = [
    "off",
    "env1",
    "env2",
    "lfo",
    "velocity",
    "aftertouch",
    "mod_wheel",
    "pitch_bend",
    "key_track",
    "breath",
    "foot",
    "expression",
    "sustain",
    "random",
    "gate",
    "constant",
];

pub const LFO_SHAPES: [&str; 5] = ["sine", "triangle", "saw", "square", "sample_hold"];

pub const TRIGGER_SOURCES: [&str; 3] = ["keyboard", "midi", "clock"];

pub const TRIGGER_MODES: [&str; 2] = ["single", "multi"];

const fn amount(id: ParameterId, name: &'static str, index: usize, default: u8) -> ParameterSpec {
    ParameterSpec {
        id,
        name,
        offset: PARAMETER_START + index,
        min: 0,
        max: 127,
        default,
        kind: ParameterKind::Amount,
        labels: &[],
    }
}

const fn source(id: ParameterId, name: &'static str, index: usize) -> ParameterSpec {
    ParameterSpec {
        id,
        name,
        offset: PARAMETER_START + index,
        min: 0,
        max: 15,
        default: 0,
        kind: ParameterKind::ModSource,
        labels: &MOD_SOURCES,
    }
}

const fn contained(
    id: ParameterId,
    name: &'static str,
    index: usize,
    labels: &'static [&'static str],
) -> ParameterSpec {
    ParameterSpec {
        id,
        name,
        offset: PARAMETER_START + index,
        min: 0,
        max: (labels.len() - 1) as u8,
        default: 0,
        kind: ParameterKind::Contained,
        labels,
    }
}

/// The parameter table, ordered by ascending offset.
pub const PARAMETERS: [ParameterSpec; PARAMETER_COUNT] = {
    use ParameterId::*;
    [
        amount(Env1Attack, "env1_attack", 0, 0),
        amount(Env1Decay, "env1_decay", 1, 64),
        amount(Env1Sustain, "env1_sustain", 2, 100),
        amount(Env1Release, "env1_release", 3, 20),
        amount(Env2Attack, "env2_attack", 4, 0),
        amount(Env2Decay, "env2_decay", 5, 64),
        amount(Env2Sustain, "env2_sustain", 6, 100),
        amount(Env2Release, "env2_release", 7, 20),
        amount(LfoRate, "lfo_rate", 8, 64),
        contained(LfoShape, "lfo_shape", 9, &LFO_SHAPES),
        amount(LfoDepth, "lfo_depth", 10, 0),
        amount(LfoDelay, "lfo_delay", 11, 0),
        amount(Mod1Amount, "mod1_amount", 12, 0),
        source(Mod1Source, "mod1_source", 13),
        amount(Mod2Amount, "mod2_amount", 14, 0),
        source(Mod2Source, "mod2_source", 15),
        amount(Mod3Amount, "mod3_amount", 16, 0),
        source(Mod3Source, "mod3_source", 17),
        amount(Mod4Amount, "mod4_amount", 18, 0),
        source(Mod4Source, "mod4_source", 19),
        amount(Mod5Amount, "mod5_amount", 20, 0),
        source(Mod5Source, "mod5_source", 21),
        amount(Cutoff, "cutoff", 22, 127),
        amount(Resonance, "resonance", 23, 0),
        amount(Volume, "volume", 24, 100),
        amount(Panning, "panning", 25, 64),
        amount(GateTime, "gate_time", 26, 64),
        contained(TriggerSource, "trigger_source", 27, &TRIGGER_SOURCES),
        contained(TriggerMode, "trigger_mode", 28, &TRIGGER_MODES),
    ]
};

impl ParameterId {
    /// Every parameter in dump order.
    pub const ALL: [ParameterId; PARAMETER_COUNT] = {
        let mut all = [ParameterId::Env1Attack; PARAMETER_COUNT];
        let mut i = 0;
        while i < PARAMETER_COUNT {
            all[i] = PARAMETERS[i].id;
            i += 1;
        }
        all
    };

    /// Position in dump order (0..29).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static ParameterSpec {
        &PARAMETERS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn offset(self) -> usize {
        self.spec().offset
    }

    pub fn default_value(self) -> u8 {
        self.spec().default
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_offset(offset: usize) -> Option<Self> {
        offset
            .checked_sub(PARAMETER_START)
            .and_then(Self::from_index)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PARAMETERS.iter().find(|spec| spec.name == name).map(|spec| spec.id)
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s.trim()).ok_or_else(|| format!("unknown parameter '{s}'"))
    }
}
