//! This crate contains the architecture-agnostic logic for the pulsegrid, an 8-step drum-sequencer
//! control surface that keeps itself locked to an external [MIDI](https://midi.org/midi-1-0)
//! transport. The surface scans a bank of 16 potentiometers through an 8-phase analog multiplexer,
//! decodes a push/rotate selector, and turns what it sees into MIDI note and controller messages
//! for the attached drum synthesizer.
//!
//! Everything here is a plain state machine: hardware access is modeled behind small traits
//! ([`TransportHandler`][transport::TransportHandler], [`SelectorHandler`][selector::SelectorHandler],
//! [`ParameterHandler`][parameters::ParameterHandler], [`ByteSink`][midi_out::ByteSink]) so the
//! whole crate builds and tests on the host.

#![deny(missing_docs)]
#![no_std]

pub mod configuration;

pub mod instrument;

pub mod midi_out;

pub mod parameters;

pub mod pattern;

pub mod selector;

pub mod step_display;

pub mod transport;
