//! Access-control state machine
//!
//! The station is always in exactly one [`SecurityState`]. Radio tokens and
//! the local button are the only inputs; the violation counter they drive is
//! written to a [`CounterStore`](crate::storage::CounterStore) before any
//! transition is reported, so cycling power cannot reset a brute-force attempt.
//!
//! ```text
//!                 credential / button
//!   Locked{c} ─────────────────────────────► Unlocked
//!     │  ▲  ◄───────────────────────────────    │
//!     │  │        credential / button           │
//!     │  └─ wrong token (c + 1 < MAX)           │ wrong token: ignored
//!     │
//!     └─ wrong token (c + 1 == MAX) ──► Disabled{MAX}   (boot-time factory reset only)
//! ```

mod credential;
mod machine;
mod state;

pub use credential::{Credential, MAX_CREDENTIAL_LEN};
pub use machine::{AuthStateMachine, BootMode, FAILS_KEY};
pub use state::{MAX_ATTEMPTS, Notification, SecurityState, Transition};
