//! The multiplexed position/step indicator.
//!
//! The two LED chains share the analog sweep's 3-bit multiplexer address, so the display can
//! only ever light one lamp pair per phase and must be refreshed in lock-step with sampling.
//! Odd phases show the running position, even phases show which steps of the focused row are
//! enabled; chain A carries lamps 0 to 3, chain B lamps 4 to 7.

use crate::pattern::STEP_COUNT;

/// Levels of the two indicator LED chains during one multiplexer phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedFrame {
    /// Chain A, lamps 0 to 3.
    pub chain_a: bool,
    /// Chain B, lamps 4 to 7.
    pub chain_b: bool,
}

/// Tracks what the indicator should show and renders it one phase at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepDisplay {
    step: u8,
    enabled_steps: u8,
}

impl StepDisplay {
    /// A display showing step 0 of an empty row.
    pub const fn new() -> Self {
        Self {
            step: 0,
            enabled_steps: 0,
        }
    }

    /// Moves the running-position lamp.
    pub fn set_step(&mut self, step: u8) {
        self.step = step % STEP_COUNT;
    }

    /// Replaces the step-enable lamps with the focused row's mask.
    pub fn set_enabled_steps(&mut self, mask: u8) {
        self.enabled_steps = mask;
    }

    /// Chain levels for one multiplexer phase (`0..8`).
    pub fn frame(&self, phase: u8) -> LedFrame {
        let lamp = phase / 2;
        if phase % 2 == 1 {
            LedFrame {
                chain_a: lamp == self.step,
                chain_b: lamp + 4 == self.step,
            }
        } else {
            LedFrame {
                chain_a: self.enabled_steps & (1 << lamp) != 0,
                chain_b: self.enabled_steps & (1 << (lamp + 4)) != 0,
            }
        }
    }
}
