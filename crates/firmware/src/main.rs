//! pulsegrid is [Embassy](https://embassy.dev)-based firmware for an 8-step drum-sequencer
//! control surface: 16 potentiometers behind an 8-way analog multiplexer, a push/rotate
//! selector, two multiplexed indicator-LED chains, and a DIN-MIDI port. The firmware runs on
//! the [Nucleo-F767ZI development board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html),
//! which is powered by an F7-series STM32 microcontroller.
//!
//! The surface never generates tempo of its own. It follows the external transport: MIDI clock
//! pulses drive the step sequencer, Start/Stop/Continue and Song Position Pointer move it, and
//! everything the performer touches goes back out as MIDI notes and control changes.
//!
//! Two execution contexts exist. [`midi::midi_input_task`] is the receive context: it consumes
//! the transport stream one byte at a time and is the only writer of the clock state machine.
//! [`panel::panel_task`] is the synchronous main loop: it sweeps the multiplexer forever,
//! sampling pots, selector, and refreshing the indicator lamps in lock-step. The two meet only
//! through `embassy-sync` watches, which hand consistent value snapshots across.

#![no_std]
#![no_main]

mod midi;
mod panel;
mod sequencer;
mod transport_indicator;
mod voice_focus;

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::{
    Config,
    adc::Adc,
    bind_interrupts,
    exti::ExtiInput,
    gpio::{Input, Level, Output, Pull, Speed},
    peripherals,
    time::Hertz,
    usart::{self, Uart},
};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    mutex,
    watch::{Receiver, Sender, Watch},
};
use pulsegrid_lib::{
    configuration::{ClockDivision, LoopLength},
    instrument::Instrument,
    midi_out::MidiOut,
    pattern::Pattern,
    transport::{TransportClock, TransportSnapshot},
};
use static_cell::StaticCell;
use wmidi::Channel;

use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        USART2 => usart::InterruptHandler<peripherals::USART2>;
    }
);

/// The channel the surface speaks on; channel 10 is General MIDI percussion.
const MIDI_CHANNEL: Channel = Channel::Ch10;

/// The outbound MIDI writer, shared by the sequencer (notes) and the panel (control changes).
pub type MidiOutMutex = mutex::Mutex<CriticalSectionRawMutex, MidiOut<midi::UartSink>>;

const BEAT_RECEIVER_CNT: usize = 1;
type BeatSync = Watch<CriticalSectionRawMutex, u8, BEAT_RECEIVER_CNT>;
pub type BeatSender<'a> = Sender<'a, CriticalSectionRawMutex, u8, BEAT_RECEIVER_CNT>;
pub type BeatReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, u8, BEAT_RECEIVER_CNT>;

/// Publishes each beat the transport clock derives from the stream.
static BEAT_SYNC: BeatSync = Watch::new();

const TRANSPORT_RECEIVER_CNT: usize = 1;
type TransportSync = Watch<CriticalSectionRawMutex, TransportSnapshot, TRANSPORT_RECEIVER_CNT>;
pub type TransportSnapshotSender<'a> =
    Sender<'a, CriticalSectionRawMutex, TransportSnapshot, TRANSPORT_RECEIVER_CNT>;
pub type TransportSnapshotReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, TransportSnapshot, TRANSPORT_RECEIVER_CNT>;

/// Publishes a consistent copy of the clock state after every received byte.
static TRANSPORT_SYNC: TransportSync = Watch::new();

const PATTERN_RECEIVER_CNT: usize = 1;
type PatternSync = Watch<CriticalSectionRawMutex, Pattern, PATTERN_RECEIVER_CNT>;
pub type PatternSender<'a> = Sender<'a, CriticalSectionRawMutex, Pattern, PATTERN_RECEIVER_CNT>;
pub type PatternReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, Pattern, PATTERN_RECEIVER_CNT>;

/// Publishes the pattern as the panel edits it.
static PATTERN_SYNC: PatternSync = Watch::new();

const STEP_RECEIVER_CNT: usize = 1;
type StepSync = Watch<CriticalSectionRawMutex, u8, STEP_RECEIVER_CNT>;
pub type StepSender<'a> = Sender<'a, CriticalSectionRawMutex, u8, STEP_RECEIVER_CNT>;
pub type StepReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, u8, STEP_RECEIVER_CNT>;

/// Publishes the step the sequencer last played, for the position lamps.
static STEP_SYNC: StepSync = Watch::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing pulsegrid");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        // pll: phase-locked loop, crucial for dividing clock
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            divq: None,
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
    }
    let p = embassy_stm32::init(config);

    // The DIN-MIDI port: 31250 baud, 8N1.
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = midi::MIDI_BAUD;
    let uart = unwrap!(Uart::new(
        p.USART2,
        p.PD6,
        p.PD5,
        Irqs,
        p.DMA1_CH6,
        p.DMA1_CH5,
        uart_config
    ));
    let (tx, rx) = uart.split();

    static MIDI_OUT: StaticCell<MidiOutMutex> = StaticCell::new();
    let midi_out = MIDI_OUT.init(mutex::Mutex::new(MidiOut::new(
        midi::UartSink::new(tx),
        MIDI_CHANNEL,
    )));

    // The beat grid is fixed for the life of the device (spinning it at runtime would tear
    // the sequencer away from the host's position).
    let division = ClockDivision::SixteenthNote;
    let loop_length = LoopLength::EightBeats;
    let clock = TransportClock::new(division.prescale(), loop_length.beats());

    let snapshots = TRANSPORT_SYNC.sender();
    snapshots.send(TransportSnapshot::default());
    unwrap!(spawner.spawn(midi::midi_input_task(
        rx,
        clock,
        BEAT_SYNC.sender(),
        snapshots
    )));

    // Something to hear before the first edit.
    let mut pattern = Pattern::new();
    for step in [0, 4] {
        pattern.toggle(Instrument::BassDrum, step);
    }
    for step in [2, 6] {
        pattern.toggle(Instrument::SnareDrum, step);
    }
    for step in [0, 2, 4, 6] {
        pattern.toggle(Instrument::ClosedHiHat, step);
    }
    let patterns = PATTERN_SYNC.sender();
    patterns.send(pattern);

    unwrap!(spawner.spawn(sequencer::sequencer_task(
        midi_out,
        BEAT_SYNC
            .receiver()
            .expect("Beat synchronizer should have a receiver available"),
        PATTERN_SYNC
            .receiver()
            .expect("Pattern synchronizer should have a receiver available"),
        STEP_SYNC.sender(),
    )));

    let panel = panel::Panel {
        mux: [
            Output::new(p.PF13, Level::Low, Speed::Low),
            Output::new(p.PF14, Level::Low, Speed::Low),
            Output::new(p.PF15, Level::Low, Speed::Low),
        ],
        adc: Adc::new(p.ADC1),
        chain_a: p.PA3,
        chain_b: p.PC0,
        selector_left: Input::new(p.PG2, Pull::Up),
        selector_right: Input::new(p.PG3, Pull::Up),
        selector_press: Input::new(p.PD7, Pull::Up),
        led_chain_a: Output::new(p.PE14, Level::Low, Speed::Low),
        led_chain_b: Output::new(p.PE15, Level::Low, Speed::Low),
    };
    unwrap!(spawner.spawn(panel::panel_task(
        panel,
        pattern,
        patterns,
        STEP_SYNC
            .receiver()
            .expect("Step synchronizer should have a receiver available"),
        voice_focus::FOCUS_SYNC
            .receiver()
            .expect("Focus synchronizer should have a receiver available"),
        midi_out,
    )));

    let button = ExtiInput::new(p.PC13, p.EXTI13, Pull::None);
    unwrap!(spawner.spawn(voice_focus::voice_focus_task(
        button,
        voice_focus::FOCUS_SYNC.sender()
    )));

    let blue_led = Output::new(p.PB7, Level::Low, Speed::Low);
    unwrap!(spawner.spawn(transport_indicator::transport_indicator_task(
        blue_led,
        TRANSPORT_SYNC
            .receiver()
            .expect("Transport synchronizer should have a receiver available"),
    )));
}
