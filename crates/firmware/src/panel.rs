//! The panel engine: the device's synchronous main loop.
//!
//! One task sweeps the 8-phase multiplexer forever. Each sweep samples the selector once;
//! each phase advances the 3-bit address, waits out the analog settle time, reads both
//! potentiometer chains, and refreshes the indicator lamp pair that shares the address.
//! Parameter changes are batched during the phase and flushed as control changes afterwards,
//! so the sampling handlers never wait on the MIDI writer.

use crate::{MidiOutMutex, PatternSender, StepReceiver, voice_focus::FocusReceiver};
use defmt::{debug, info};
use embassy_stm32::{
    Peri,
    adc::{Adc, AdcChannel},
    gpio::{Input, Level, Output},
    peripherals::{ADC1, PA3, PC0},
};
use embassy_time::Timer;
use pulsegrid_lib::{
    instrument::Instrument,
    parameters::{CHAINS_PER_PHASE, PHASES_PER_SWEEP, ParameterBank, ParameterHandler},
    pattern::{Pattern, STEP_COUNT},
    selector::{Selector, SelectorHandler, SelectorLines},
    step_display::StepDisplay,
};
use tinyvec::ArrayVec;

/// Settle time after the multiplexer address changes, before the chains are trusted.
const MUX_SETTLE_US: u64 = 1;

/// Conversions averaged per chain read.
const OVERSAMPLE: u32 = 4;

/// Hardware owned by the panel task.
pub struct Panel {
    /// The shared 3-bit multiplexer address, LSB first.
    pub mux: [Output<'static>; 3],
    /// Converter behind both potentiometer chains.
    pub adc: Adc<'static, ADC1>,
    /// Analog input of chain 0.
    pub chain_a: Peri<'static, PA3>,
    /// Analog input of chain 1.
    pub chain_b: Peri<'static, PC0>,
    /// Rotation line that leads clockwise detents; active low.
    pub selector_left: Input<'static>,
    /// Rotation line that leads counterclockwise detents; active low.
    pub selector_right: Input<'static>,
    /// Push line; active low.
    pub selector_press: Input<'static>,
    /// Indicator lamps 0 to 3.
    pub led_chain_a: Output<'static>,
    /// Indicator lamps 4 to 7.
    pub led_chain_b: Output<'static>,
}

/// Applies selector edges to the pattern edit state.
struct EditActions<'a> {
    pattern: &'a mut Pattern,
    focus: Instrument,
    cursor: &'a mut u8,
    dirty: bool,
}

impl SelectorHandler for EditActions<'_> {
    fn on_pressed(&mut self) {
        self.pattern.toggle(self.focus, *self.cursor);
        self.dirty = true;
        debug!("toggled {} at step {}", self.focus, *self.cursor);
    }

    fn on_released(&mut self) {
        debug!("selector released");
    }

    fn on_rotated_left(&mut self) {
        *self.cursor = (*self.cursor + STEP_COUNT - 1) % STEP_COUNT;
        debug!("cursor at step {}", *self.cursor);
    }

    fn on_rotated_right(&mut self) {
        *self.cursor = (*self.cursor + 1) % STEP_COUNT;
        debug!("cursor at step {}", *self.cursor);
    }
}

/// Collects accepted parameter changes during one phase.
#[derive(Default)]
struct PendingChanges {
    changes: ArrayVec<[(u8, u8); CHAINS_PER_PHASE]>,
}

impl ParameterHandler for PendingChanges {
    fn on_parameter_changed(&mut self, parameter: u8, value: u8) {
        self.changes.push((parameter, value));
    }
}

/// The synchronous main loop; never returns.
#[embassy_executor::task]
pub async fn panel_task(
    mut panel: Panel,
    mut pattern: Pattern,
    patterns: PatternSender<'static>,
    mut steps: StepReceiver<'static>,
    mut focus_updates: FocusReceiver<'static>,
    midi_out: &'static MidiOutMutex,
) -> ! {
    let mut selector = Selector::new();
    let mut bank = ParameterBank::new();
    let mut display = StepDisplay::new();
    let mut focus = Instrument::default();
    let mut cursor: u8 = 0;
    display.set_enabled_steps(pattern.row(focus));

    info!("Panel engine running");
    loop {
        // The selector is sampled once per sweep; the debounce thresholds are tuned to
        // that rate.
        let lines = SelectorLines {
            left: panel.selector_left.is_low(),
            right: panel.selector_right.is_low(),
            pressed: panel.selector_press.is_low(),
        };
        let mut edits = EditActions {
            pattern: &mut pattern,
            focus,
            cursor: &mut cursor,
            dirty: false,
        };
        selector.sample(lines, &mut edits);
        if edits.dirty {
            patterns.send(pattern);
            display.set_enabled_steps(pattern.row(focus));
        }

        if let Some(new_focus) = focus_updates.try_changed() {
            focus = new_focus;
            display.set_enabled_steps(pattern.row(focus));
        }
        if let Some(step) = steps.try_changed() {
            display.set_step(step);
        }

        for phase in 0..PHASES_PER_SWEEP as u8 {
            // Lamps off while the address moves; the chains jump to other outputs.
            panel.led_chain_a.set_low();
            panel.led_chain_b.set_low();
            select_phase(&mut panel.mux, phase);
            Timer::after_micros(MUX_SETTLE_US).await;

            let readings = [
                read_chain(&mut panel.adc, &mut panel.chain_a),
                read_chain(&mut panel.adc, &mut panel.chain_b),
            ];
            let mut pending = PendingChanges::default();
            bank.sync(phase, readings, &mut pending);

            let frame = display.frame(phase);
            panel.led_chain_a.set_level(Level::from(frame.chain_a));
            panel.led_chain_b.set_level(Level::from(frame.chain_b));

            if !pending.changes.is_empty() {
                let mut out = midi_out.lock().await;
                for (parameter, value) in pending.changes {
                    out.parameter_change(parameter, value);
                }
            }
        }
    }
}

/// Drives the 3-bit multiplexer address.
fn select_phase(mux: &mut [Output<'static>; 3], phase: u8) {
    for (bit, line) in mux.iter_mut().enumerate() {
        line.set_level(Level::from(phase & (1 << bit) != 0));
    }
}

/// One oversampled conversion, scaled to the bank's 8-bit range.
///
/// Blocks for the conversion latency; this is the only blocking wait in the main loop and it
/// is bounded by the oversampling count.
fn read_chain(adc: &mut Adc<'static, ADC1>, chain: &mut impl AdcChannel<ADC1>) -> u8 {
    // The first conversion after the address change lands on a stale sample-and-hold;
    // read it and throw it away.
    let _ = adc.blocking_read(chain);

    let mut sum: u32 = 0;
    for _ in 0..OVERSAMPLE {
        sum += u32::from(adc.blocking_read(chain));
    }
    // 12-bit conversions, averaged, reduced to the 8-bit parameter range.
    ((sum / OVERSAMPLE) >> 4) as u8
}
