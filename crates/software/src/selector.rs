//! Debounced decoding of the panel's push/rotate selector.
//!
//! The selector exposes three lines: two quadrature-style rotation lines and a push line. All
//! three are sampled together, once per synchronization sweep, by the main loop. Run counters
//! saturate rather than wrap, so a stuck line settles into silence instead of repeating edges.

/// Consecutive active samples before a press is accepted.
const PRESS_THRESHOLD: u8 = 6;

/// Saturation cap for the press run counter; sits above the threshold so the edge fires once.
const PRESS_RUN_CAP: u8 = 8;

/// Consecutive active samples before a rotation edge is accepted.
const ROTATION_THRESHOLD: u8 = 2;

/// Saturation cap for the rotation run counters.
const ROTATION_RUN_CAP: u8 = 3;

/// Levels of the three selector lines for one sample; `true` means active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelectorLines {
    /// The rotation line that leads on clockwise detents.
    pub left: bool,
    /// The rotation line that leads on counterclockwise detents.
    pub right: bool,
    /// The push line.
    pub pressed: bool,
}

/// Edge events decoded from the selector.
///
/// Each method defaults to a no-op; callbacks run synchronously inside the sampling call and
/// must fit inside the cycle budget.
pub trait SelectorHandler {
    /// The button has been held for the full debounce interval.
    fn on_pressed(&mut self) {}

    /// The button was released after a press that reached the debounce interval.
    fn on_released(&mut self) {}

    /// One counterclockwise detent.
    fn on_rotated_left(&mut self) {}

    /// One clockwise detent.
    fn on_rotated_right(&mut self) {}
}

/// Debounce state for the selector; feed it with [`sample`][Selector::sample].
#[derive(Debug, Default)]
pub struct Selector {
    left_run: u8,
    right_run: u8,
    press_run: u8,
}

impl Selector {
    /// A selector with all lines assumed idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one sample of the three lines, firing at most one rotation edge and the
    /// press/release edges that this sample confirms.
    pub fn sample(&mut self, lines: SelectorLines, handler: &mut impl SelectorHandler) {
        self.detect_press(lines.pressed, handler);
        self.detect_rotation(lines.left, lines.right, handler);
    }

    fn detect_press(&mut self, pressed: bool, handler: &mut impl SelectorHandler) {
        if pressed {
            if self.press_run < PRESS_RUN_CAP {
                self.press_run += 1;
            }
            // Equality, not >=: the edge fires on the sample that reaches the threshold and
            // never again while the button stays down.
            if self.press_run == PRESS_THRESHOLD {
                handler.on_pressed();
            }
        } else {
            if self.press_run >= PRESS_THRESHOLD {
                handler.on_released();
            }
            self.press_run = 0;
        }
    }

    fn detect_rotation(&mut self, left: bool, right: bool, handler: &mut impl SelectorHandler) {
        if left {
            if self.left_run < ROTATION_RUN_CAP {
                self.left_run += 1;
            }
        } else {
            self.left_run = 0;
        }

        if right {
            if self.right_run < ROTATION_RUN_CAP {
                self.right_run += 1;
            }
        } else {
            self.right_run = 0;
        }

        // The line that goes active first decides the direction; requiring the other line to
        // still be inactive keeps a single physical detent from firing both ways.
        if self.left_run == ROTATION_THRESHOLD && !right {
            handler.on_rotated_right();
        } else if self.right_run == ROTATION_THRESHOLD && !left {
            handler.on_rotated_left();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyvec::ArrayVec;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    enum Event {
        #[default]
        None,
        Pressed,
        Released,
        RotatedLeft,
        RotatedRight,
    }

    #[derive(Default)]
    struct EventLog {
        events: ArrayVec<[Event; 16]>,
    }

    impl SelectorHandler for EventLog {
        fn on_pressed(&mut self) {
            self.events.push(Event::Pressed);
        }
        fn on_released(&mut self) {
            self.events.push(Event::Released);
        }
        fn on_rotated_left(&mut self) {
            self.events.push(Event::RotatedLeft);
        }
        fn on_rotated_right(&mut self) {
            self.events.push(Event::RotatedRight);
        }
    }

    fn press(pressed: bool) -> SelectorLines {
        SelectorLines {
            pressed,
            ..Default::default()
        }
    }

    fn rotation(left: bool, right: bool) -> SelectorLines {
        SelectorLines {
            left,
            right,
            ..Default::default()
        }
    }

    fn run(selector: &mut Selector, log: &mut EventLog, samples: &[SelectorLines]) {
        for &lines in samples {
            selector.sample(lines, log);
        }
    }

    #[test]
    fn press_held_past_threshold_fires_exactly_once() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(&mut selector, &mut log, &[press(true); 12]);

        assert_eq!(
            &[Event::Pressed][..],
            log.events.as_slice(),
            "Holding the button should not repeat the edge"
        );
    }

    #[test]
    fn release_fires_only_after_an_accepted_press() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(&mut selector, &mut log, &[press(true); 7]);
        run(&mut selector, &mut log, &[press(false); 3]);

        assert_eq!(
            &[Event::Pressed, Event::Released][..],
            log.events.as_slice(),
            "Expected left but got right"
        );
    }

    #[test]
    fn bounce_below_threshold_fires_nothing() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(&mut selector, &mut log, &[press(true); 5]);
        run(&mut selector, &mut log, &[press(false); 2]);
        run(&mut selector, &mut log, &[press(true); 4]);
        run(&mut selector, &mut log, &[press(false); 1]);

        assert!(
            log.events.is_empty(),
            "Runs that never reach the threshold must not produce edges"
        );
    }

    #[test]
    fn left_line_leading_is_a_clockwise_detent() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(&mut selector, &mut log, &[rotation(true, false); 2]);

        assert_eq!(
            &[Event::RotatedRight][..],
            log.events.as_slice(),
            "Expected left but got right"
        );
    }

    #[test]
    fn right_line_leading_is_a_counterclockwise_detent() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(&mut selector, &mut log, &[rotation(false, true); 2]);

        assert_eq!(
            &[Event::RotatedLeft][..],
            log.events.as_slice(),
            "Expected left but got right"
        );
    }

    #[test]
    fn an_isolated_active_sample_fires_nothing() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(
            &mut selector,
            &mut log,
            &[rotation(true, false), rotation(false, false)],
        );

        assert!(log.events.is_empty(), "One sample is below the threshold");
    }

    #[test]
    fn a_held_rotation_line_fires_exactly_once() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(&mut selector, &mut log, &[rotation(true, false); 10]);

        assert_eq!(
            &[Event::RotatedRight][..],
            log.events.as_slice(),
            "The saturated run counter must not re-fire"
        );
    }

    #[test]
    fn both_lines_active_suppresses_the_cross_check() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        // Both lines reach their thresholds together; neither direction may fire.
        run(&mut selector, &mut log, &[rotation(true, true); 4]);

        assert!(
            log.events.is_empty(),
            "A detent must not be reported in both directions"
        );
    }

    #[test]
    fn at_most_one_direction_per_sample() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        // Right goes active while left is bouncing off; only one edge may come out of the
        // sample where both counters sit at the threshold.
        run(
            &mut selector,
            &mut log,
            &[
                rotation(true, false),
                rotation(true, true),
                rotation(false, true),
                rotation(false, true),
            ],
        );

        assert_eq!(
            &[Event::RotatedLeft][..],
            log.events.as_slice(),
            "Expected left but got right"
        );
    }

    #[test]
    fn rotation_edges_repeat_for_separate_detents() {
        let mut selector = Selector::new();
        let mut log = EventLog::default();

        run(&mut selector, &mut log, &[rotation(true, false); 2]);
        run(&mut selector, &mut log, &[rotation(false, false); 1]);
        run(&mut selector, &mut log, &[rotation(true, false); 2]);

        assert_eq!(
            &[Event::RotatedRight, Event::RotatedRight][..],
            log.events.as_slice(),
            "Each detent should be reported"
        );
    }
}
