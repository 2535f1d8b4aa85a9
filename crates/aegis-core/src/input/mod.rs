//! Local button input

mod button;

pub use button::{DebouncedButton, factory_reset_requested};

/// Debounced event from the station's physical button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// One press-release cycle started.
    Pressed,
}

/// Source of local button events, polled once per tick
pub trait LocalInputSource {
    /// Take the pending event, if any. Read failures read as `None`.
    fn try_event(&mut self) -> Option<ButtonEvent>;
}
