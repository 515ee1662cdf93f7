//! The MIDI byte streams: the receive context that follows the transport, and the transmit
//! sink behind the outbound writer.

use crate::{BeatSender, TransportSnapshotSender};
use defmt::warn;
use embassy_stm32::{
    mode::Async,
    usart::{UartRx, UartTx},
};
use pulsegrid_lib::{
    midi_out::ByteSink,
    transport::{TransportClock, TransportHandler},
};

/// Baud rate of a DIN-MIDI link.
pub const MIDI_BAUD: u32 = 31250;

/// Hands beats from the receive context to the rest of the device.
///
/// A watch send is a plain store behind a short critical section, which keeps the beat
/// callback inside the receive path's non-blocking budget.
struct BeatPublisher<'a> {
    beats: BeatSender<'a>,
}

impl TransportHandler for BeatPublisher<'_> {
    fn on_beat(&mut self, beat: u8) {
        self.beats.send(beat);
    }
}

/// The receive context: consumes the transport stream one byte at a time.
///
/// This task is the only writer of the clock state machine, and each byte is processed to
/// completion before the next read is issued, so byte handling is never reentered. Everyone
/// else observes the clock through the snapshot watch.
#[embassy_executor::task]
pub async fn midi_input_task(
    mut rx: UartRx<'static, Async>,
    mut clock: TransportClock,
    beats: BeatSender<'static>,
    snapshots: TransportSnapshotSender<'static>,
) -> ! {
    let mut publisher = BeatPublisher { beats };
    let mut buf = [0_u8; 1];
    loop {
        match rx.read(&mut buf).await {
            Ok(()) => {
                clock.receive_byte(buf[0], &mut publisher);
                snapshots.send(clock.snapshot());
            }
            // Framing or overrun noise on the wire; the stream resynchronizes at the next
            // recognized byte.
            Err(e) => warn!("MIDI receive error: {}", e),
        }
    }
}

/// Blocking transmit primitive behind the outbound writer.
pub struct UartSink {
    tx: UartTx<'static, Async>,
}

impl UartSink {
    /// Wraps the transmit half of the MIDI UART.
    pub fn new(tx: UartTx<'static, Async>) -> Self {
        Self { tx }
    }
}

impl ByteSink for UartSink {
    fn write(&mut self, byte: u8) {
        // Nothing downstream can carry a transmit error; log it and move on.
        if self.tx.blocking_write(&[byte]).is_err() {
            warn!("MIDI transmit error");
        }
    }
}
