//! Hardware-independent core library for aegis
//!
//! This crate contains all platform-agnostic logic for the station's access
//! control: the security state machine, the durable violation counter, the
//! radio and button collaborators it polls, the per-tick control loop, and the
//! mapping from security state to what the presentation layer shows.
//!
//! It is `no_std` with `extern crate alloc` so it compiles on both the
//! embedded target (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod fob;
pub mod input;
pub mod presentation;
pub mod radio;
pub mod security;
pub mod station;
pub mod storage;

pub use app_state::{AuthError, ConfigError, RadioError, StoreError};
pub use security::{AuthStateMachine, BootMode, Notification, SecurityState, Transition};
pub use station::{Station, TickReport};
