//! Tick-sampled button debouncing
//!
//! ```text
//!             pressed for N samples
//!  Released ────────────────────────► Held     (reports Pressed once)
//!     ▲                                 │
//!     └───── released for N samples ────┘
//! ```
//!
//! A sample that disagrees with the settled level only counts towards a
//! change while it keeps disagreeing; one agreeing sample resets the count.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::debug;

use super::{ButtonEvent, LocalInputSource};

/// Spacing between boot-window samples of the reset button
const FACTORY_RESET_SAMPLE_MS: u32 = 10;

/// Button on an active-low input with a pull-up
pub struct DebouncedButton<P> {
    pin: P,
    threshold: u8,
    /// Consecutive samples disagreeing with `pressed`
    disagreeing: u8,
    pressed: bool,
}

impl<P: InputPin> DebouncedButton<P> {
    /// Wrap `pin`, treating its current level as settled.
    ///
    /// A button that is already held (for instance after a boot-time factory
    /// reset) must be released before it can report a press.
    pub fn new(mut pin: P, threshold: u8) -> Self {
        let pressed = pin.is_low().unwrap_or(false);
        Self {
            pin,
            threshold: threshold.max(1),
            disagreeing: 0,
            pressed,
        }
    }

    pub fn is_held(&self) -> bool {
        self.pressed
    }
}

impl<P: InputPin> LocalInputSource for DebouncedButton<P> {
    fn try_event(&mut self) -> Option<ButtonEvent> {
        let sample = match self.pin.is_low() {
            Ok(low) => low,
            Err(e) => {
                debug!("Button read failed: {:?}", embedded_hal::digital::Error::kind(&e));
                return None;
            }
        };

        if sample == self.pressed {
            self.disagreeing = 0;
            return None;
        }

        self.disagreeing += 1;
        if self.disagreeing < self.threshold {
            return None;
        }

        self.disagreeing = 0;
        self.pressed = sample;
        sample.then_some(ButtonEvent::Pressed)
    }
}

/// Whether the button is held through the whole boot window.
///
/// Samples `samples` times, `FACTORY_RESET_SAMPLE_MS` apart. Any released
/// sample or read failure means no reset.
pub fn factory_reset_requested<P, D>(pin: &mut P, samples: u16, delay: &mut D) -> bool
where
    P: InputPin,
    D: DelayNs,
{
    for _ in 0..samples.max(1) {
        if !matches!(pin.is_low(), Ok(true)) {
            return false;
        }
        delay.delay_ms(FACTORY_RESET_SAMPLE_MS);
    }
    true
}
