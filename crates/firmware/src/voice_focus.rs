//! Selection of the drum voice the panel edits and displays.

use defmt::info;
use embassy_stm32::exti::ExtiInput;
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    watch::{Receiver, Sender, Watch},
};
use pulsegrid_lib::{configuration::CycleConfig, instrument::Instrument};

const FOCUS_RECEIVER_CNT: usize = 1;

/// Syncs the focused drum voice across tasks.
pub static FOCUS_SYNC: Watch<CriticalSectionRawMutex, Instrument, FOCUS_RECEIVER_CNT> =
    Watch::new_with(Instrument::BassDrum);
pub type FocusSender<'a> = Sender<'a, CriticalSectionRawMutex, Instrument, FOCUS_RECEIVER_CNT>;
pub type FocusReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, Instrument, FOCUS_RECEIVER_CNT>;

/// Handles presses of the board button, cycling the focused voice.
#[embassy_executor::task]
pub async fn voice_focus_task(mut button: ExtiInput<'static>, focus: FocusSender<'static>) -> ! {
    loop {
        button.wait_for_rising_edge().await;

        let new_focus = focus
            .try_get()
            .expect("Focus watch is initialized with a voice")
            .cycle();
        info!("Focused voice: {}", new_focus);
        focus.send(new_focus);
    }
}
