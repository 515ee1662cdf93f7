//! Step on/off state for each drum voice.

use crate::instrument::{INSTRUMENT_COUNT, Instrument};
use num_traits::FromPrimitive;

/// Steps in one sequence row.
pub const STEP_COUNT: u8 = 8;

/// One step mask per drum voice. Small enough to be copied between tasks as a value snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pattern {
    rows: [u8; INSTRUMENT_COUNT],
}

impl Pattern {
    /// An empty pattern.
    pub const fn new() -> Self {
        Self {
            rows: [0; INSTRUMENT_COUNT],
        }
    }

    /// Flips one step of one voice.
    pub fn toggle(&mut self, voice: Instrument, step: u8) {
        debug_assert!(step < STEP_COUNT);
        self.rows[voice as usize] ^= 1 << step;
    }

    /// Whether `voice` plays on `step`.
    pub fn is_set(&self, voice: Instrument, step: u8) -> bool {
        self.rows[voice as usize] & (1 << step) != 0
    }

    /// The step mask of one voice's row.
    pub fn row(&self, voice: Instrument) -> u8 {
        self.rows[voice as usize]
    }

    /// The voices that play on `step`, in panel order.
    pub fn voices_at(&self, step: u8) -> impl Iterator<Item = Instrument> + '_ {
        (0..INSTRUMENT_COUNT as u8)
            .filter_map(Instrument::from_u8)
            .filter(move |voice| self.is_set(*voice, step))
    }
}
