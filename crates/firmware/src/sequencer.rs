//! Turns published beats into drum hits.

use crate::{BeatReceiver, MidiOutMutex, PatternReceiver, StepSender};
use defmt::debug;
use pulsegrid_lib::pattern::STEP_COUNT;
use wmidi::U7;

/// Velocity of every hit; the panel has no per-step accent control.
const HIT_VELOCITY: U7 = U7::from_u8_lossy(100);

/// Plays the pattern: on each beat, close the previous step's notes, then sound every voice
/// whose step bit is set. Notes therefore gate for exactly one beat without anyone sleeping.
#[embassy_executor::task]
pub async fn sequencer_task(
    midi_out: &'static MidiOutMutex,
    mut beats: BeatReceiver<'static>,
    mut patterns: PatternReceiver<'static>,
    steps: StepSender<'static>,
) -> ! {
    loop {
        let beat = beats.changed().await;
        // A 16-beat loop replays the 8-step pattern.
        let step = beat % STEP_COUNT;
        let pattern = patterns
            .try_get()
            .expect("Pattern should be seeded before tasks start");

        {
            let mut out = midi_out.lock().await;
            out.release_triggered();
            for voice in pattern.voices_at(step) {
                out.trigger(voice, HIT_VELOCITY);
            }
        }

        steps.send(step);
        debug!("beat {} -> step {}", beat, step);
    }
}
