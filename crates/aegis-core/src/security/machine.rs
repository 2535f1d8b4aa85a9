use log::{error, info, warn};

use crate::app_state::AuthError;
use crate::radio::RadioMessage;
use crate::storage::CounterStore;

use super::credential::Credential;
use super::state::{MAX_ATTEMPTS, Notification, SecurityState, Transition};

/// Store key holding the violation counter
pub const FAILS_KEY: &str = "fails";

/// How the station was powered up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    Normal,
    /// Reset button held through the boot window: clear violation history first.
    FactoryReset,
}

/// Owner of the security state and the durable violation counter
///
/// The only ways to change state are [`on_radio_message`](Self::on_radio_message)
/// and [`on_local_unlock_request`](Self::on_local_unlock_request). Each writes
/// the resulting counter to the store before changing the in-memory state, so
/// a failed write leaves the machine exactly where it was.
pub struct AuthStateMachine<S> {
    state: SecurityState,
    credential: Credential,
    store: S,
}

impl<S: CounterStore> AuthStateMachine<S> {
    /// Derive the initial state from the persisted counter.
    ///
    /// A counter that cannot be read boots straight into lockdown; only a
    /// factory reset gets the station out of that.
    pub fn boot(mut store: S, credential: Credential, mode: BootMode) -> Self {
        if mode == BootMode::FactoryReset {
            match store.clear() {
                Ok(()) => info!("Factory reset: violation history cleared"),
                Err(e) => error!("Factory reset could not clear the counter store: {}", e),
            }
        }

        let state = match store.get(FAILS_KEY) {
            Ok(violations) => SecurityState::from_violations(violations),
            Err(e) => {
                error!("Violation counter unreadable, failing closed: {}", e);
                SecurityState::Disabled {
                    violation_count: MAX_ATTEMPTS,
                }
            }
        };

        match state {
            SecurityState::Disabled { violation_count } => {
                warn!("Booted in lockdown ({} violations)", violation_count)
            }
            _ => info!("Booted locked ({} violations)", state.violation_count()),
        }

        Self {
            state,
            credential,
            store,
        }
    }

    /// Current state; no side effects.
    pub fn snapshot(&self) -> SecurityState {
        self.state
    }

    /// Feed one inbound radio token.
    pub fn on_radio_message(&mut self, message: &RadioMessage) -> Result<Transition, AuthError> {
        let matched = self.credential.matches(message);

        match (self.state, matched) {
            (SecurityState::Disabled { .. }, _) => Ok(Transition::Ignored),
            (SecurityState::Locked { .. }, true) => {
                self.commit(0, SecurityState::Unlocked, Notification::AccessGranted)
            }
            (SecurityState::Unlocked, true) => self.commit(
                0,
                SecurityState::Locked { violation_count: 0 },
                Notification::RemoteLocked,
            ),
            // A wrong guess while already open is not a violation
            (SecurityState::Unlocked, false) => Ok(Transition::Ignored),
            (SecurityState::Locked { violation_count }, false) => {
                let violations = violation_count.saturating_add(1);
                if violations >= MAX_ATTEMPTS {
                    self.commit(
                        violations,
                        SecurityState::Disabled {
                            violation_count: violations,
                        },
                        Notification::LockdownTriggered,
                    )
                } else {
                    self.commit(
                        violations,
                        SecurityState::Locked {
                            violation_count: violations,
                        },
                        Notification::AccessDenied {
                            attempts_remaining: MAX_ATTEMPTS - violations,
                        },
                    )
                }
            }
        }
    }

    /// Physical button: toggles lock without a credential, never leaves lockdown.
    pub fn on_local_unlock_request(&mut self) -> Result<Transition, AuthError> {
        match self.state {
            SecurityState::Disabled { .. } => Ok(Transition::Ignored),
            SecurityState::Locked { .. } => {
                self.commit(0, SecurityState::Unlocked, Notification::ManualUnlock)
            }
            SecurityState::Unlocked => self.commit(
                0,
                SecurityState::Locked { violation_count: 0 },
                Notification::ManualLock,
            ),
        }
    }

    /// Read-only view of the backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, e.g. to boot a fresh machine from it.
    pub fn into_store(self) -> S {
        self.store
    }

    fn commit(
        &mut self,
        violations: u32,
        next: SecurityState,
        notification: Notification,
    ) -> Result<Transition, AuthError> {
        if let Err(e) = self.store.set(FAILS_KEY, violations) {
            error!(
                "Counter write failed, keeping {:?} instead of {:?}: {}",
                self.state, next, e
            );
            return Err(AuthError::Persist(e));
        }

        match notification {
            Notification::LockdownTriggered => {
                warn!("Lockdown triggered after {} violations", violations)
            }
            Notification::AccessDenied { attempts_remaining } => {
                warn!("Credential rejected, {} attempts remaining", attempts_remaining)
            }
            _ => info!("{:?}: {:?} -> {:?}", notification, self.state, next),
        }

        self.state = next;
        Ok(Transition::Accepted(notification))
    }
}
