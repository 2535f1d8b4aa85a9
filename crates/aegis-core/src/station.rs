//! Per-tick control loop
//!
//! Each tick takes at most one radio message and at most one button event,
//! runs them through the state machine in that order, publishes every
//! resulting notification and reports the state to render.

use log::warn;

use crate::app_state::{AuthError, SecurityPublisher};
use crate::input::{ButtonEvent, LocalInputSource};
use crate::radio::RadioLink;
use crate::security::{AuthStateMachine, Notification, SecurityState, Transition};
use crate::storage::CounterStore;

/// What one tick produced, for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub state: SecurityState,
    /// Notifications for transitions accepted this tick, in order
    pub notifications: heapless::Vec<Notification, 2>,
    /// Lockdown alarm; raised on every tick spent disabled
    pub alarm: bool,
}

pub struct Station<'a, S, R, B> {
    machine: AuthStateMachine<S>,
    radio: R,
    button: B,
    publisher: Option<SecurityPublisher<'a>>,
}

impl<'a, S, R, B> Station<'a, S, R, B>
where
    S: CounterStore,
    R: RadioLink,
    B: LocalInputSource,
{
    pub fn new(machine: AuthStateMachine<S>, radio: R, button: B) -> Self {
        Self {
            machine,
            radio,
            button,
            publisher: None,
        }
    }

    /// Also publish notifications on a pub-sub channel.
    pub fn with_publisher(mut self, publisher: SecurityPublisher<'a>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn tick(&mut self) -> TickReport {
        let mut notifications = heapless::Vec::new();

        if let Some(message) = self.radio.try_receive() {
            let result = self.machine.on_radio_message(&message);
            self.record(result, &mut notifications);
        }

        if let Some(ButtonEvent::Pressed) = self.button.try_event() {
            let result = self.machine.on_local_unlock_request();
            self.record(result, &mut notifications);
        }

        let state = self.machine.snapshot();
        TickReport {
            state,
            notifications,
            alarm: state.is_disabled(),
        }
    }

    pub fn snapshot(&self) -> SecurityState {
        self.machine.snapshot()
    }

    /// Tear down, returning the store so a restart can boot from it.
    pub fn into_parts(self) -> (AuthStateMachine<S>, R, B) {
        (self.machine, self.radio, self.button)
    }

    fn record(
        &mut self,
        result: Result<Transition, AuthError>,
        notifications: &mut heapless::Vec<Notification, 2>,
    ) {
        match result {
            Ok(Transition::Accepted(notification)) => {
                // Two inputs per tick at most, so this never overflows
                let _ = notifications.push(notification);
                if let Some(publisher) = &self.publisher {
                    publisher.publish_immediate(notification);
                }
            }
            Ok(Transition::Ignored) => {}
            // Already logged by the machine; to everyone else this looks like an ignored event
            Err(e) => warn!("Event dropped: {}", e),
        }
    }
}
