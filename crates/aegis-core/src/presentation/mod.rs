//! What the display and buzzer should show for the current security state
//!
//! The presentation layer is purely reactive: it gets a [`TickReport`] every
//! tick and never feeds anything back into the state machine.

mod buzzer;

pub use buzzer::BuzzerSink;

use crate::security::{Notification, SecurityState};
use crate::station::TickReport;

/// Screen the display should be on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    /// Monitoring suspended, waiting for the key fob or the button.
    LockScreen {
        violation_count: u32,
        attempts_remaining: u32,
    },
    /// Sensor dashboard; monitoring active.
    Dashboard,
    /// Lockdown screen; shown until a factory reset.
    Breach,
}

impl From<SecurityState> for ScreenMode {
    fn from(state: SecurityState) -> Self {
        match state {
            SecurityState::Locked { violation_count } => Self::LockScreen {
                violation_count,
                attempts_remaining: state.attempts_remaining(),
            },
            SecurityState::Unlocked => Self::Dashboard,
            SecurityState::Disabled { .. } => Self::Breach,
        }
    }
}

/// Audible cue for the buzzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTone {
    /// Rising two-note chime
    Granted,
    /// Single low note
    Locked,
    /// Short double beep
    Denied,
    /// Continuous alternating tone
    Siren,
}

impl From<Notification> for AlertTone {
    fn from(notification: Notification) -> Self {
        match notification {
            Notification::AccessGranted | Notification::ManualUnlock => Self::Granted,
            Notification::RemoteLocked | Notification::ManualLock => Self::Locked,
            Notification::AccessDenied { .. } => Self::Denied,
            Notification::LockdownTriggered => Self::Siren,
        }
    }
}

/// A display, buzzer or log that renders the station's state
pub trait PresentationSink {
    /// Called every tick with the screen to show.
    fn render(&mut self, screen: ScreenMode);

    /// Called once per cue to sound.
    fn alert(&mut self, tone: AlertTone);
}

/// Drive `sink` from one tick.
///
/// Sounds one cue per notification, then the siren again on every tick the
/// station stays disabled, then renders the screen.
pub fn present<P: PresentationSink>(sink: &mut P, report: &TickReport) {
    for notification in &report.notifications {
        sink.alert(AlertTone::from(*notification));
    }
    // The lockdown tick already sounded the siren through its notification
    let siren_sounded = report
        .notifications
        .contains(&Notification::LockdownTriggered);
    if report.alarm && !siren_sounded {
        sink.alert(AlertTone::Siren);
    }
    sink.render(ScreenMode::from(report.state));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        screens: Vec<ScreenMode>,
        tones: Vec<AlertTone>,
    }

    impl PresentationSink for Recorder {
        fn render(&mut self, screen: ScreenMode) {
            self.screens.push(screen);
        }

        fn alert(&mut self, tone: AlertTone) {
            self.tones.push(tone);
        }
    }

    fn report(state: SecurityState, notifications: &[Notification]) -> TickReport {
        TickReport {
            state,
            notifications: heapless::Vec::from_slice(notifications).unwrap(),
            alarm: state.is_disabled(),
        }
    }

    #[test]
    fn lock_screen_shows_remaining_attempts() {
        assert_eq!(
            ScreenMode::from(SecurityState::Locked { violation_count: 1 }),
            ScreenMode::LockScreen {
                violation_count: 1,
                attempts_remaining: 2
            }
        );
    }

    #[test]
    fn quiet_tick_only_renders() {
        let mut sink = Recorder::default();
        present(&mut sink, &report(SecurityState::Unlocked, &[]));

        assert_eq!(sink.screens, vec![ScreenMode::Dashboard]);
        assert!(sink.tones.is_empty());
    }

    #[test]
    fn each_notification_sounds_once() {
        let mut sink = Recorder::default();
        let tick = report(
            SecurityState::Locked { violation_count: 0 },
            &[Notification::AccessGranted, Notification::ManualLock],
        );
        present(&mut sink, &tick);

        assert_eq!(sink.tones, vec![AlertTone::Granted, AlertTone::Locked]);
    }

    #[test]
    fn siren_repeats_while_disabled() {
        let mut sink = Recorder::default();
        let disabled = SecurityState::Disabled { violation_count: 3 };

        present(&mut sink, &report(disabled, &[Notification::LockdownTriggered]));
        present(&mut sink, &report(disabled, &[]));
        present(&mut sink, &report(disabled, &[]));

        assert_eq!(sink.tones, vec![AlertTone::Siren; 3]);
        assert_eq!(sink.screens, vec![ScreenMode::Breach; 3]);
    }
}
