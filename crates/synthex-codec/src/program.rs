use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use synthex_frame::{PARAMETER_COUNT, PROGRAM_COUNT};

use crate::error::{CodecError, Result};
use crate::globals::GlobalSettings;
use crate::params::{ParameterId, ParameterSpec, PARAMETERS};

/// One program: a value for each of the 29 parameters.
///
/// Only explicitly set parameters are stored; the rest read as their table
/// default. Equality compares effective values, so a program that sets a
/// parameter to its default equals one that leaves it unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<ParameterId, u8>",
    try_from = "BTreeMap<ParameterId, u8>"
)]
pub struct Program {
    values: BTreeMap<ParameterId, u8>,
}

impl Program {
    /// A program with every parameter at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective value of `id`.
    pub fn get(&self, id: ParameterId) -> u8 {
        self.values
            .get(&id)
            .copied()
            .unwrap_or_else(|| id.default_value())
    }

    /// Set `id`, rejecting values outside its declared range.
    pub fn set(&mut self, id: ParameterId, value: u8) -> Result<()> {
        check_range(id.spec(), value)?;
        self.values.insert(id, value);
        Ok(())
    }

    /// Builder form of [`Program::set`].
    pub fn with(mut self, id: ParameterId, value: u8) -> Result<Self> {
        self.set(id, value)?;
        Ok(self)
    }

    /// Return `id` to its default.
    pub fn reset(&mut self, id: ParameterId) {
        self.values.remove(&id);
    }

    pub fn is_set(&self, id: ParameterId) -> bool {
        self.values.contains_key(&id)
    }

    /// Every parameter with its effective value, in dump order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, u8)> + '_ {
        ParameterId::ALL.into_iter().map(|id| (id, self.get(id)))
    }

    /// Parameter bytes in dump order.
    pub fn to_bytes(&self) -> [u8; PARAMETER_COUNT] {
        let mut bytes = [0u8; PARAMETER_COUNT];
        for (slot, (_, value)) in bytes.iter_mut().zip(self.iter()) {
            *slot = value;
        }
        bytes
    }

    /// Validate and adopt 29 parameter bytes in dump order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PARAMETER_COUNT {
            return Err(CodecError::MalformedFrame(format!(
                "expected {PARAMETER_COUNT} parameter bytes, got {}",
                bytes.len()
            )));
        }
        let mut values = BTreeMap::new();
        for (spec, &value) in PARAMETERS.iter().zip(bytes) {
            check_range(spec, value)?;
            values.insert(spec.id, value);
        }
        Ok(Self { values })
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        ParameterId::ALL
            .into_iter()
            .all(|id| self.get(id) == other.get(id))
    }
}

impl Eq for Program {}

impl From<Program> for BTreeMap<ParameterId, u8> {
    fn from(program: Program) -> Self {
        program.iter().collect()
    }
}

impl TryFrom<BTreeMap<ParameterId, u8>> for Program {
    type Error = CodecError;

    fn try_from(map: BTreeMap<ParameterId, u8>) -> Result<Self> {
        let mut program = Self::new();
        for (id, value) in map {
            program.set(id, value)?;
        }
        Ok(program)
    }
}

fn check_range(spec: &ParameterSpec, value: u8) -> Result<()> {
    if spec.contains(value) {
        Ok(())
    } else {
        Err(CodecError::ParameterOutOfRange {
            name: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        })
    }
}

/// Everything an all dump carries: 20 programs and the global settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub programs: [Program; PROGRAM_COUNT],
    pub globals: GlobalSettings,
}

impl DeviceProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self, number: u8) -> Result<&Program> {
        self.programs
            .get(usize::from(number))
            .ok_or(CodecError::ProgramNumberOutOfRange(number))
    }

    pub fn program_mut(&mut self, number: u8) -> Result<&mut Program> {
        self.programs
            .get_mut(usize::from(number))
            .ok_or(CodecError::ProgramNumberOutOfRange(number))
    }

    pub fn set_program(&mut self, number: u8, program: Program) -> Result<()> {
        *self.program_mut(number)? = program;
        Ok(())
    }
}

/// Program numbers run 0..20.
pub fn check_program_number(number: u8) -> Result<u8> {
    if usize::from(number) < PROGRAM_COUNT {
        Ok(number)
    } else {
        Err(CodecError::ProgramNumberOutOfRange(number))
    }
}
