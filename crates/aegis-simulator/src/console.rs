//! Operator console: line commands and the simulated station button

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Press the station's local button
    Press,
    /// Press the key fob's button
    Fob,
    /// Power-cycle the station
    Restart,
    Status,
    Quit,
    /// Anything else goes on air from the fob
    Transmit(&'a str),
}

impl<'a> Command<'a> {
    /// Parse one console line. Blank lines are `None`.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_ascii();
        let command = match line {
            "" => return None,
            "press" => Self::Press,
            "fob" => Self::Fob,
            "restart" => Self::Restart,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            other => Self::Transmit(other),
        };
        Some(command)
    }
}

/// Active-low button line held down for a number of samples
///
/// Clones share the same line, so the console can hold it while the station
/// owns a [`DebouncedButton`](aegis_core::input::DebouncedButton) reading it.
#[derive(Clone, Default)]
pub struct SimulatedPin {
    held_samples: Rc<Cell<u32>>,
}

impl SimulatedPin {
    /// Hold the button for the next `samples` reads.
    pub fn hold_for(&self, samples: u32) {
        self.held_samples.set(samples);
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl InputPin for SimulatedPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        let remaining = self.held_samples.get();
        if remaining == 0 {
            return Ok(false);
        }
        self.held_samples.set(remaining - 1);
        Ok(true)
    }
}
