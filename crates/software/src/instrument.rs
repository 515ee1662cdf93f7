//! The drum voices of the control surface.

use crate::configuration::CycleConfig;
use num_derive::{FromPrimitive, ToPrimitive};
use wmidi::Note;

/// Number of drum voices.
pub const INSTRUMENT_COUNT: usize = 8;

/// The eight drum voices, in panel order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instrument {
    /// Voice 0, the panel's startup focus.
    #[default]
    BassDrum,
    /// Voice 1.
    SnareDrum,
    /// Voice 2.
    MidTom,
    /// Voice 3.
    Rimshot,
    /// Voice 4.
    HandClap,
    /// Voice 5.
    ClosedHiHat,
    /// Voice 6.
    OpenHiHat,
    /// Voice 7.
    CrashCymbal,
}

impl Instrument {
    /// General MIDI percussion note that triggers this voice on the attached synthesizer.
    pub fn note(self) -> Note {
        Note::from_u8_lossy(match self {
            Self::BassDrum => 36,
            Self::SnareDrum => 38,
            Self::MidTom => 45,
            Self::Rimshot => 37,
            Self::HandClap => 39,
            Self::ClosedHiHat => 42,
            Self::OpenHiHat => 46,
            Self::CrashCymbal => 49,
        })
    }

    /// This voice's bit in trigger and pattern masks.
    pub(crate) fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

impl CycleConfig for Instrument {}
