//! Multiplexed analog parameter scanning with direction-gated change detection.
//!
//! The 16 panel potentiometers sit behind an 8-way analog multiplexer, two conversion chains
//! deep: each multiplexer phase exposes one pot per chain. Physical wiring does not match the
//! panel's logical order, and half the pots are soldered in reverse, so every reading passes
//! through a fixed correction table before it reaches the bank.
//!
//! Change detection is direction-gated: a reading only produces an event while it continues in
//! the direction of the previous accepted change. The first sample after a reversal is swallowed,
//! trading one sample of latency for immunity against jitter at turning points.

/// Number of logical parameters on the panel.
pub const PARAMETER_COUNT: usize = 16;

/// Analog conversion chains read during each multiplexer phase.
pub const CHAINS_PER_PHASE: usize = 2;

/// Multiplexer phases in one full sweep.
pub const PHASES_PER_SWEEP: usize = 8;

/// Full-scale normalized reading.
const FULL_SCALE: u8 = u8::MAX;

/// One entry of the wiring-correction table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingEntry {
    /// Logical parameter index this physical position feeds.
    pub parameter: u8,
    /// True for pots wired in reverse; the reading is flipped to `255 - raw`.
    pub inverted: bool,
}

/// Physical-to-logical wiring of the two potentiometer chains, indexed by
/// `phase + 8 * chain`. Fixed by the board layout.
pub static PARAMETER_MAP: [MappingEntry; PARAMETER_COUNT] = [
    // chain 0
    MappingEntry { parameter: 7, inverted: false },
    MappingEntry { parameter: 6, inverted: false },
    MappingEntry { parameter: 5, inverted: false },
    MappingEntry { parameter: 3, inverted: true },
    MappingEntry { parameter: 0, inverted: true },
    MappingEntry { parameter: 2, inverted: true },
    MappingEntry { parameter: 4, inverted: false },
    MappingEntry { parameter: 1, inverted: true },
    // chain 1
    MappingEntry { parameter: 14, inverted: false },
    MappingEntry { parameter: 13, inverted: false },
    MappingEntry { parameter: 12, inverted: false },
    MappingEntry { parameter: 15, inverted: false },
    MappingEntry { parameter: 8, inverted: true },
    MappingEntry { parameter: 11, inverted: true },
    MappingEntry { parameter: 9, inverted: true },
    MappingEntry { parameter: 10, inverted: true },
];

/// Receives accepted parameter changes. The default body drops the event.
pub trait ParameterHandler {
    /// An accepted change of `parameter` to `value`.
    fn on_parameter_changed(&mut self, parameter: u8, value: u8) {
        let _ = (parameter, value);
    }
}

/// Sign of the last accepted change of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Rising,
    Falling,
}

impl Direction {
    fn of(diff: i16) -> Self {
        if diff > 0 { Self::Rising } else { Self::Falling }
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    value: u8,
    direction: Direction,
}

/// Filtered values of all 16 panel parameters.
#[derive(Debug)]
pub struct ParameterBank {
    slots: [Slot; PARAMETER_COUNT],
}

impl Default for ParameterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterBank {
    /// A bank with every parameter at zero.
    pub fn new() -> Self {
        Self {
            slots: [Slot {
                value: 0,
                direction: Direction::Rising,
            }; PARAMETER_COUNT],
        }
    }

    /// Most recent accepted value of a parameter.
    pub fn value(&self, parameter: u8) -> u8 {
        self.slots[usize::from(parameter)].value
    }

    /// Feeds the normalized readings of one multiplexer phase (`0..8`) into the bank,
    /// reporting every accepted change through `handler`.
    pub fn sync(
        &mut self,
        phase: u8,
        readings: [u8; CHAINS_PER_PHASE],
        handler: &mut impl ParameterHandler,
    ) {
        debug_assert!((phase as usize) < PHASES_PER_SWEEP);
        for (chain, &raw) in readings.iter().enumerate() {
            let entry = &PARAMETER_MAP[phase as usize + PHASES_PER_SWEEP * chain];
            let value = if entry.inverted { FULL_SCALE - raw } else { raw };
            self.update(entry.parameter, value, handler);
        }
    }

    fn update(&mut self, parameter: u8, value: u8, handler: &mut impl ParameterHandler) {
        let slot = &mut self.slots[usize::from(parameter)];
        let diff = i16::from(value) - i16::from(slot.value);
        if diff == 0 {
            return;
        }
        let direction = Direction::of(diff);
        if direction == slot.direction {
            slot.value = value;
            handler.on_parameter_changed(parameter, value);
        } else {
            // A reversal: remember the new trend and the reading, but swallow this sample.
            slot.direction = direction;
            slot.value = value;
        }
    }
}
