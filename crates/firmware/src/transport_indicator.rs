//! Transport status lamp.

use crate::TransportSnapshotReceiver;
use defmt::info;
use embassy_stm32::gpio::Output;

/// Lights the lamp while the transport is stopped.
///
/// Consumes the snapshot watch, the synchronous side's only view of the clock state; every
/// update is a complete record, never a half-written one.
#[embassy_executor::task]
pub async fn transport_indicator_task(
    mut led: Output<'static>,
    mut snapshots: TransportSnapshotReceiver<'static>,
) -> ! {
    let mut paused = false;
    loop {
        let snapshot = snapshots.changed().await;
        if snapshot.paused != paused {
            paused = snapshot.paused;
            info!("Transport {}", if paused { "stopped" } else { "running" });
            if paused {
                led.set_high();
            } else {
                led.set_low();
            }
        }
    }
}
