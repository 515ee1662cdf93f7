//! Startup configuration of the sequencer's beat grid, plus a trait to make enum-typed
//! settings easy to drive from pushbutton interfaces.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};

/// A trait which allows infinite cycling of an enum's variants.
///
/// Useful for pushbutton user interfaces, allowing presses to advance from the current to the
/// next variant, cycling back to the beginning when all variants have been exhausted.
pub trait CycleConfig {
    /// Return the next variant, cycling back to the beginning as needed.
    fn cycle(self) -> Self
    where
        Self: FromPrimitive + ToPrimitive + Sized,
    {
        let index = self
            .to_u8()
            .expect("enum variants should be castable to u8");
        match <Self as FromPrimitive>::from_u8(index + 1) {
            Some(new_selection) => new_selection,
            None => FromPrimitive::from_u8(0).expect("enum should not be empty"),
        }
    }
}

/// Note value of one sequencer beat, expressed against the transport's 24 clocks per quarter.
///
/// Consulted once at startup; the clock prescaler is immutable for the life of the device.
#[derive(Debug, Clone, Copy, ToPrimitive, FromPrimitive, PartialEq)]
pub enum ClockDivision {
    /// One beat per quarter note.
    QuarterNote,
    /// One beat per eighth note.
    EighthNote,
    /// One beat per 16th note, the usual grid for a 16-step bar.
    SixteenthNote,
}

impl ClockDivision {
    /// Clock pulses that make up one beat at this division.
    pub fn prescale(&self) -> u8 {
        match self {
            Self::QuarterNote => 24,
            Self::EighthNote => 12,
            Self::SixteenthNote => 6,
        }
    }
}

impl CycleConfig for ClockDivision {}

/// Length of the sequencer loop in beats.
///
/// The panel carries 8 step lamps; a 16-beat loop plays the 8-step pattern twice per cycle.
#[derive(Debug, Clone, Copy, ToPrimitive, FromPrimitive, PartialEq)]
pub enum LoopLength {
    /// One bar of eight beats.
    EightBeats,
    /// Two bars.
    SixteenBeats,
}

impl LoopLength {
    /// Beats per full loop.
    pub fn beats(&self) -> u8 {
        match self {
            Self::EightBeats => 8,
            Self::SixteenBeats => 16,
        }
    }
}

impl CycleConfig for LoopLength {}
