//! Assembly and transmission of outbound MIDI messages.
//!
//! Messages are serialized through [`wmidi::MidiMessage`] and handed byte by byte to a
//! [`ByteSink`], the raw transmit primitive. Drum voices are sounded through the trigger
//! bookkeeping: every note-on is recorded so [`MidiOut::release_triggered`] can close all
//! sounding notes before the next step, giving each hit exactly one beat of gate time
//! without the main loop ever sleeping on it.

use crate::instrument::{INSTRUMENT_COUNT, Instrument};
use num_traits::FromPrimitive;
use wmidi::{Channel, ControlFunction, MidiMessage, Note, U7};

/// First controller number of the panel's parameter block; the 16 parameters report on
/// controllers 16 to 31.
pub const PARAMETER_CC_BASE: u8 = 16;

/// Raw byte-level transmit primitive.
///
/// The firmware implements this over a blocking UART write; tests implement it over a buffer.
pub trait ByteSink {
    /// Transmits one byte, blocking until the sink accepts it.
    fn write(&mut self, byte: u8);
}

/// Assembles and transmits outbound messages on one fixed channel.
pub struct MidiOut<S: ByteSink> {
    sink: S,
    channel: Channel,
    /// Bit per [`Instrument`] currently sounding.
    triggered: u8,
}

impl<S: ByteSink> MidiOut<S> {
    /// A writer sending on `channel` (channel 10 for General MIDI percussion).
    pub fn new(sink: S, channel: Channel) -> Self {
        Self {
            sink,
            channel,
            triggered: 0,
        }
    }

    /// Sends a note-on.
    pub fn note_on(&mut self, note: Note, velocity: U7) {
        self.send(MidiMessage::NoteOn(self.channel, note, velocity));
    }

    /// Sends a note-off.
    pub fn note_off(&mut self, note: Note) {
        self.send(MidiMessage::NoteOff(self.channel, note, U7::from_u8_lossy(0)));
    }

    /// Sounds a drum voice and records it for the next [`release_triggered`][Self::release_triggered].
    pub fn trigger(&mut self, instrument: Instrument, velocity: U7) {
        self.note_on(instrument.note(), velocity);
        self.triggered |= instrument.mask();
    }

    /// Closes every voice recorded as sounding, then clears the record.
    pub fn release_triggered(&mut self) {
        for index in 0..INSTRUMENT_COUNT as u8 {
            let Some(instrument) = Instrument::from_u8(index) else {
                continue;
            };
            if self.triggered & instrument.mask() != 0 {
                self.note_off(instrument.note());
            }
        }
        self.triggered = 0;
    }

    /// Reports a panel parameter change as a control change on `PARAMETER_CC_BASE + parameter`.
    ///
    /// Parameter values are 8-bit; the controller value keeps the top 7.
    pub fn parameter_change(&mut self, parameter: u8, value: u8) {
        self.control_change(PARAMETER_CC_BASE + parameter, value >> 1);
    }

    /// Sends an arbitrary control change; `value` is truncated to 7 bits.
    pub fn control_change(&mut self, controller: u8, value: u8) {
        self.send(MidiMessage::ControlChange(
            self.channel,
            ControlFunction(U7::from_u8_lossy(controller)),
            U7::from_u8_lossy(value),
        ));
    }

    fn send(&mut self, message: MidiMessage) {
        let mut bytes = [0_u8; 3];
        if let Ok(n) = message.copy_to_slice(&mut bytes) {
            for &byte in &bytes[..n] {
                self.sink.write(byte);
            }
        }
    }
}
