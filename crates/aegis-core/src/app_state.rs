//! Application-wide event channel and error types for aegis

use core::fmt::{Debug, Write};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};
use thiserror_no_std::Error;

use crate::security::Notification;

/// Channel capacity for security notifications
/// A tick emits at most two, so 4 covers a slow subscriber for one extra tick
pub const EVENT_CHANNEL_CAPACITY: usize = 4;

/// Number of subscribers that can listen to security notifications
/// - Subscriber 0: display / buzzer task
/// - Subscriber 1: operational log or telemetry forwarder
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Number of publishers (just the station control loop)
pub const EVENT_PUBLISHERS: usize = 1;

/// Pub-sub channel carrying one-shot security notifications
pub type SecurityChannel = PubSubChannel<
    CriticalSectionRawMutex,
    Notification,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type SecurityPublisher<'a> = Publisher<
    'a,
    CriticalSectionRawMutex,
    Notification,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type SecuritySubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    Notification,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

/// Global channel used by the firmware; host code usually owns a local one.
pub static SECURITY_CHANNEL: SecurityChannel = PubSubChannel::new();

/// Failure of the durable counter store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(heapless::String<64>),
    #[error("persisted counter table is corrupt")]
    Corrupt,
    #[error("storage backend unavailable")]
    Unavailable,
}

impl StoreError {
    /// Wrap a backend error, keeping as much of its debug text as fits.
    pub fn io(err: impl Debug) -> Self {
        Self::Io(truncated(format_args!("{err:?}")))
    }
}

/// A transition that was refused because its counter write did not commit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("violation counter write failed: {0}")]
    Persist(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Persist(err)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    #[error("SPI bus transfer failed")]
    Bus,
    #[error("unexpected radio chip version {version:#04x}")]
    UnknownChip { version: u8 },
    #[error("payload of {len} bytes exceeds the radio packet size")]
    PayloadTooLarge { len: usize },
    #[error("transmission did not complete")]
    TxTimeout,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("credential is empty")]
    EmptyCredential,
    #[error("credential of {len} bytes does not fit in a radio message")]
    CredentialTooLong { len: usize },
    #[error("debounce must be at least one tick")]
    ZeroDebounce,
    #[error("{key} is not a valid value")]
    InvalidValue { key: &'static str },
}

/// Format into a bounded string, dropping whatever does not fit.
fn truncated<const N: usize>(args: core::fmt::Arguments<'_>) -> heapless::String<N> {
    struct Bounded<const N: usize>(heapless::String<N>);

    impl<const N: usize> Write for Bounded<N> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            for c in s.chars() {
                if self.0.push(c).is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    let mut out = Bounded::<N>(heapless::String::new());
    let _ = out.write_fmt(args);
    out.0
}
