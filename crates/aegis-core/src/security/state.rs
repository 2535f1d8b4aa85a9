//! Security state, transition results and the notifications they carry

/// Rejected credentials tolerated before the station locks itself down
pub const MAX_ATTEMPTS: u32 = 3;

/// Current security state of the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityState {
    /// Monitoring suspended; waiting for the credential or the local button.
    Locked { violation_count: u32 },
    /// Monitoring active; the credential or the button locks again.
    Unlocked,
    /// Lockdown. Ignores every runtime input until a boot-time factory reset.
    Disabled { violation_count: u32 },
}

impl SecurityState {
    /// State derived from a persisted violation count at boot
    pub const fn from_violations(violation_count: u32) -> Self {
        if violation_count >= MAX_ATTEMPTS {
            Self::Disabled { violation_count }
        } else {
            Self::Locked { violation_count }
        }
    }

    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled { .. })
    }

    /// Violations on record; always 0 while unlocked
    pub const fn violation_count(&self) -> u32 {
        match self {
            Self::Locked { violation_count } | Self::Disabled { violation_count } => {
                *violation_count
            }
            Self::Unlocked => 0,
        }
    }

    /// Wrong tokens left before lockdown
    pub const fn attempts_remaining(&self) -> u32 {
        match self {
            Self::Locked { violation_count } => MAX_ATTEMPTS.saturating_sub(*violation_count),
            Self::Unlocked => MAX_ATTEMPTS,
            Self::Disabled { .. } => 0,
        }
    }
}

/// One-shot notification emitted for every accepted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Credential received while locked.
    AccessGranted,
    /// Credential received while unlocked.
    RemoteLocked,
    /// Local button pressed while locked.
    ManualUnlock,
    /// Local button pressed while unlocked.
    ManualLock,
    /// Wrong token received while locked, lockdown not yet reached.
    AccessDenied { attempts_remaining: u32 },
    /// Wrong token pushed the violation count to [`MAX_ATTEMPTS`].
    LockdownTriggered,
}

/// Outcome of feeding one event to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed and the counter write committed.
    Accepted(Notification),
    /// Event had no effect in the current state.
    Ignored,
}

impl Transition {
    pub const fn notification(&self) -> Option<Notification> {
        match self {
            Self::Accepted(notification) => Some(*notification),
            Self::Ignored => None,
        }
    }
}
