//! The clock state machine that follows the external MIDI transport.
//!
//! The transport host emits a byte stream of single-byte realtime messages (Timing Clock, Start,
//! Continue, Stop) and multi-byte messages such as Song Position Pointer. Realtime bytes may
//! legally appear in the middle of any other message, so the parser classifies one byte at a time
//! and lets realtime bytes act without disturbing whatever assembly is in flight.
//!
//! [`TransportClock::receive_byte`] is meant to be driven from the receive context (an interrupt
//! handler or the task that owns the UART) and completes without blocking. Other contexts never
//! touch the clock itself; they observe a [`TransportSnapshot`] copied out after each byte.

use tinyvec::ArrayVec;

/// MIDI Timing Clock, sent 24 times per quarter note.
const TIMING_CLOCK: u8 = 0xF8;

/// MIDI Start: rewind to the top of the loop and run.
const START: u8 = 0xFA;

/// MIDI Continue: run from wherever the transport stopped.
const CONTINUE: u8 = 0xFB;

/// MIDI Stop.
const STOP: u8 = 0xFC;

/// MIDI Song Position Pointer; two data bytes follow.
const SONG_POSITION_POINTER: u8 = 0xF2;

/// A song position unit is one 16th note, i.e. six Timing Clocks.
const CLOCKS_PER_POSITION_UNIT: u32 = 6;

/// Handler for events derived from the transport stream.
///
/// Implementations run inside the receive context and must stay short and non-blocking. The
/// default method body ignores the event, so a handler subscribes only to what it cares about.
pub trait TransportHandler {
    /// Called once every `prescale` clock pulses with the beat index, which cycles
    /// `0, 1, .., beats_per_cycle - 1`.
    ///
    /// Beat indices are nondecreasing (modulo the cycle wrap) except across Start and Song
    /// Position Pointer messages, which deliberately jump the position.
    fn on_beat(&mut self, beat: u8) {
        let _ = beat;
    }
}

/// Commands that carry data bytes and must be assembled across several received bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PendingCommand {
    SongPosition,
}

impl PendingCommand {
    /// Number of data bytes the command needs before it can be resolved.
    fn data_len(self) -> usize {
        match self {
            Self::SongPosition => 2,
        }
    }
}

/// A consistent copy of the clock state, published to the synchronous side of the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportSnapshot {
    /// True between a Stop message and the next Start/Continue.
    pub paused: bool,
    /// Clock pulses into the current loop, always below `prescale * beats_per_cycle`.
    pub tick: u16,
}

/// Tracks the external transport's position and derives the local beat grid from it.
#[derive(Debug)]
pub struct TransportClock {
    paused: bool,
    tick: u16,
    prescale: u16,
    /// `prescale * beats_per_cycle`; the tick counter wraps to 0 here.
    reset: u16,
    pending: Option<PendingCommand>,
    pending_data: ArrayVec<[u8; 2]>,
}

impl TransportClock {
    /// Creates a clock that emits one beat every `prescale` clock pulses and counts
    /// `beats_per_cycle` beats before the loop wraps.
    ///
    /// The host sends 96 clocks per 4/4 bar, so `prescale = 6` yields 16th-note beats.
    /// Both values are fixed for the life of the device.
    pub fn new(prescale: u8, beats_per_cycle: u8) -> Self {
        debug_assert!(prescale >= 1);
        debug_assert!(beats_per_cycle >= 1);
        Self {
            paused: false,
            tick: 0,
            prescale: u16::from(prescale),
            reset: u16::from(prescale) * u16::from(beats_per_cycle),
            pending: None,
            pending_data: ArrayVec::default(),
        }
    }

    /// Consumes one byte of the transport stream.
    ///
    /// Realtime bytes are recognized first so that a clock pulse arriving in the middle of a
    /// Song Position Pointer still lands on time and leaves the assembly untouched. Unrecognized
    /// bytes are ignored; the stream self-heals at the next recognized byte.
    pub fn receive_byte(&mut self, byte: u8, handler: &mut impl TransportHandler) {
        match byte {
            TIMING_CLOCK => self.on_clock_pulse(handler),
            START => {
                self.tick = 0;
                self.paused = false;
            }
            CONTINUE => self.paused = false,
            STOP => self.paused = true,
            _ => self.on_message_byte(byte),
        }
    }

    /// Copies the current position out as one consistent record.
    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            paused: self.paused,
            tick: self.tick,
        }
    }

    fn on_clock_pulse(&mut self, handler: &mut impl TransportHandler) {
        if self.paused {
            return;
        }
        if self.tick % self.prescale == 0 {
            handler.on_beat((self.tick / self.prescale) as u8);
        }
        self.tick += 1;
        if self.tick == self.reset {
            self.tick = 0;
        }
    }

    /// Handles every byte that is not a realtime message: data bytes complete an assembly in
    /// flight, status bytes begin a new one (aborting whatever was pending).
    fn on_message_byte(&mut self, byte: u8) {
        if byte & 0x80 != 0 {
            self.pending_data.clear();
            self.pending = match byte {
                SONG_POSITION_POINTER => Some(PendingCommand::SongPosition),
                _ => None,
            };
            return;
        }

        let Some(command) = self.pending else {
            // A stray data byte with no command to attach it to.
            return;
        };
        self.pending_data.push(byte);
        if self.pending_data.len() == command.data_len() {
            self.resolve(command);
            self.pending = None;
            self.pending_data.clear();
        }
    }

    fn resolve(&mut self, command: PendingCommand) {
        match command {
            PendingCommand::SongPosition => {
                // Two 7-bit data bytes, least significant first, form the 14-bit position.
                let position =
                    u32::from(self.pending_data[0]) | (u32::from(self.pending_data[1]) << 7);
                let ticks = position * CLOCKS_PER_POSITION_UNIT;
                self.tick = (ticks % u32::from(self.reset)) as u16;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct BeatLog {
        beats: ArrayVec<[u8; 64]>,
    }

    impl TransportHandler for BeatLog {
        fn on_beat(&mut self, beat: u8) {
            self.beats.push(beat);
        }
    }

    fn feed(clock: &mut TransportClock, log: &mut BeatLog, bytes: &[u8]) {
        for &byte in bytes {
            clock.receive_byte(byte, log);
        }
    }

    #[test]
    fn beat_fires_once_per_prescale_pulses() {
        let mut clock = TransportClock::new(2, 4);
        let mut log = BeatLog::default();

        feed(&mut clock, &mut log, &[TIMING_CLOCK; 16]);

        assert_eq!(
            &[0, 1, 2, 3, 0, 1, 2, 3][..],
            log.beats.as_slice(),
            "Expected left but got right"
        );
    }

    #[test]
    fn prescale_one_fires_every_pulse() {
        let mut clock = TransportClock::new(1, 3);
        let mut log = BeatLog::default();

        feed(&mut clock, &mut log, &[TIMING_CLOCK; 7]);

        assert_eq!(
            &[0, 1, 2, 0, 1, 2, 0][..],
            log.beats.as_slice(),
            "Expected left but got right"
        );
    }

    #[test]
    fn stop_suppresses_clock_pulses() {
        let mut clock = TransportClock::new(1, 8);
        let mut log = BeatLog::default();

        feed(&mut clock, &mut log, &[TIMING_CLOCK, TIMING_CLOCK, STOP]);
        feed(&mut clock, &mut log, &[TIMING_CLOCK; 5]);

        assert_eq!(
            &[0, 1][..],
            log.beats.as_slice(),
            "Pulses received while paused should not produce beats"
        );
        assert_eq!(2, clock.snapshot().tick, "Pause should freeze the counter");
    }

    #[test]
    fn continue_resumes_from_the_stopped_position() {
        let mut clock = TransportClock::new(2, 4);
        let mut log = BeatLog::default();

        // Three pulses land us at tick 3, then the transport stops.
        feed(&mut clock, &mut log, &[TIMING_CLOCK; 3]);
        feed(&mut clock, &mut log, &[STOP, TIMING_CLOCK, CONTINUE]);
        feed(&mut clock, &mut log, &[TIMING_CLOCK; 2]);

        assert_eq!(
            &[0, 1, 2][..],
            log.beats.as_slice(),
            "Counting should pick up at tick 3, not restart at 0"
        );
    }

    #[test]
    fn start_resets_position_and_clears_pause() {
        let mut clock = TransportClock::new(1, 8);
        let mut log = BeatLog::default();

        feed(&mut clock, &mut log, &[TIMING_CLOCK; 5]);
        feed(&mut clock, &mut log, &[STOP, START, TIMING_CLOCK]);

        assert_eq!(
            &[0, 1, 2, 3, 4, 0][..],
            log.beats.as_slice(),
            "Start should rewind to beat 0 and resume the clock"
        );
        assert!(!clock.snapshot().paused);
    }

    #[test]
    fn song_position_repositions_the_counter() {
        // reset = 6 * 16 = 96 ticks.
        let mut clock = TransportClock::new(6, 16);
        let mut log = BeatLog::default();

        // Position 3 = 18 ticks; the next pulse is the downbeat of beat 3.
        feed(&mut clock, &mut log, &[SONG_POSITION_POINTER, 3, 0]);
        assert_eq!(18, clock.snapshot().tick, "Expected left but got right");

        feed(&mut clock, &mut log, &[TIMING_CLOCK]);
        assert_eq!(&[3][..], log.beats.as_slice(), "Expected left but got right");
    }

    #[test]
    fn song_position_wraps_modulo_the_loop() {
        let mut clock = TransportClock::new(6, 16);
        let mut log = BeatLog::default();

        // Position 20 = 120 ticks = 24 mod 96, i.e. beat 4.
        feed(&mut clock, &mut log, &[SONG_POSITION_POINTER, 20, 0, TIMING_CLOCK]);

        assert_eq!(&[4][..], log.beats.as_slice(), "Expected left but got right");
    }

    #[test]
    fn song_position_combines_fourteen_bits_lsb_first() {
        let mut clock = TransportClock::new(6, 16);
        let mut log = BeatLog::default();

        // (0x40 << 7) | 0x05 = 8197 units = 49182 ticks = 30 mod 96.
        feed(&mut clock, &mut log, &[SONG_POSITION_POINTER, 0x05, 0x40]);

        assert_eq!(30, clock.snapshot().tick, "Expected left but got right");
    }

    #[test]
    fn realtime_bytes_interleave_inside_a_pending_message() {
        let mut clock = TransportClock::new(6, 16);
        let mut log = BeatLog::default();

        // A clock pulse lands between the two data bytes; it must fire on time and must not
        // corrupt the song-position assembly.
        feed(
            &mut clock,
            &mut log,
            &[SONG_POSITION_POINTER, 8, TIMING_CLOCK, 0],
        );

        assert_eq!(
            &[0][..],
            log.beats.as_slice(),
            "The interleaved pulse should fire the beat for tick 0"
        );
        assert_eq!(
            48,
            clock.snapshot().tick,
            "Position 8 should resolve as if uninterrupted"
        );
    }

    #[test]
    fn unknown_status_bytes_are_ignored() {
        let mut clock = TransportClock::new(1, 4);
        let mut log = BeatLog::default();

        feed(&mut clock, &mut log, &[0xF5, 0xF1, TIMING_CLOCK]);

        assert_eq!(&[0][..], log.beats.as_slice(), "Expected left but got right");
    }

    #[test]
    fn stray_data_bytes_are_ignored() {
        let mut clock = TransportClock::new(1, 4);
        let mut log = BeatLog::default();

        feed(&mut clock, &mut log, &[0x12, 0x7F, TIMING_CLOCK]);

        assert_eq!(&[0][..], log.beats.as_slice(), "Expected left but got right");
        assert_eq!(1, clock.snapshot().tick);
    }

    #[test]
    fn a_new_status_byte_aborts_a_pending_assembly() {
        let mut clock = TransportClock::new(6, 16);
        let mut log = BeatLog::default();

        // The first pointer is cut short after one data byte; only the second resolves.
        feed(
            &mut clock,
            &mut log,
            &[SONG_POSITION_POINTER, 0x7F, SONG_POSITION_POINTER, 2, 0],
        );

        assert_eq!(12, clock.snapshot().tick, "Expected left but got right");
    }

    #[test]
    fn song_position_applies_while_paused() {
        let mut clock = TransportClock::new(6, 16);
        let mut log = BeatLog::default();

        feed(&mut clock, &mut log, &[STOP, SONG_POSITION_POINTER, 4, 0]);
        assert_eq!(24, clock.snapshot().tick);
        assert!(clock.snapshot().paused);

        feed(&mut clock, &mut log, &[CONTINUE, TIMING_CLOCK]);
        assert_eq!(&[4][..], log.beats.as_slice(), "Expected left but got right");
    }
}
