//! Controller numbers for the real-time control-change protocol.
//!
//! This mapping is independent of the dump offsets: both are keyed by
//! [`ParameterId`], neither is derived from the other.

use crate::params::ParameterId;

/// `(parameter, controller number)` pairs in dump order.
pub const CONTROLLERS: [(ParameterId, u8); 29] = {
    use ParameterId::*;
    [
        (Env1Attack, 20),
        (Env1Decay, 21),
        (Env1Sustain, 22),
        (Env1Release, 23),
        (Env2Attack, 24),
        (Env2Decay, 25),
        (Env2Sustain, 26),
        (Env2Release, 27),
        (LfoRate, 28),
        (LfoShape, 29),
        (LfoDepth, 30),
        (LfoDelay, 31),
        (Mod1Amount, 102),
        (Mod1Source, 40),
        (Mod2Amount, 103),
        (Mod2Source, 41),
        (Mod3Amount, 104),
        (Mod3Source, 42),
        (Mod4Amount, 105),
        // Hardware manual lists 0x4B here; units in the field answer on 0x2B.
        // Unverified on current firmware.
        (Mod4Source, 0x2B),
        (Mod5Amount, 106),
        (Mod5Source, 44),
        (Cutoff, 74),
        (Resonance, 71),
        (Volume, 7),
        (Panning, 10),
        (GateTime, 80),
        (TriggerSource, 81),
        (TriggerMode, 82),
    ]
};

/// Controller number that drives `parameter`.
pub fn controller_for(parameter: ParameterId) -> u8 {
    CONTROLLERS[parameter.index()].1
}

/// Parameter driven by controller `cc`, if any.
pub fn parameter_for(cc: u8) -> Option<ParameterId> {
    CONTROLLERS
        .iter()
        .find(|(_, number)| *number == cc)
        .map(|(parameter, _)| *parameter)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn rows_follow_parameter_order() {
        for (i, (parameter, _)) in CONTROLLERS.iter().enumerate() {
            assert_eq!(parameter.index(), i);
        }
    }

    #[test]
    fn controller_numbers_are_distinct_and_seven_bit() {
        let mut seen = HashSet::new();
        for (parameter, cc) in CONTROLLERS {
            assert!(cc <= 0x7F, "{parameter}");
            assert!(seen.insert(cc), "duplicate controller {cc} for {parameter}");
        }
    }

    #[test]
    fn lookups_are_inverse() {
        for parameter in ParameterId::ALL {
            assert_eq!(parameter_for(controller_for(parameter)), Some(parameter));
        }
    }

    #[test]
    fn mod4_source_keeps_field_mapping() {
        assert_eq!(controller_for(ParameterId::Mod4Source), 0x2B);
        assert_eq!(parameter_for(0x4B), None);
    }

    #[test]
    fn unmapped_controllers() {
        assert_eq!(parameter_for(1), None);
        assert_eq!(parameter_for(64), None);
        assert_eq!(parameter_for(127), None);
    }
}
