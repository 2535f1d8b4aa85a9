//! Control-channel radio
//!
//! The control channel is a low-power LoRa link physically separate from the
//! Wi-Fi upload radio. Every packet is one unframed payload; both ends
//! only agree on the carrier frequency and the sync word.

pub mod loopback;
pub mod sx127x;

pub use loopback::LoopbackRadio;
pub use sx127x::Sx127x;

use log::debug;

use crate::app_state::RadioError;

/// Largest payload the SX127x FIFO can hold in one packet
pub const MAX_FRAME_LEN: usize = 255;

/// One inbound radio payload, opaque bytes up to a full packet
#[derive(Clone, PartialEq, Eq)]
pub struct RadioMessage(heapless::Vec<u8, MAX_FRAME_LEN>);

impl RadioMessage {
    /// Accept a raw frame, or `None` if it exceeds the radio's packet size.
    ///
    /// Content is not inspected: any in-bounds payload, printable or not,
    /// reaches the state machine and is judged there.
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        match heapless::Vec::from_slice(frame) {
            Ok(bytes) => Some(Self(bytes)),
            Err(_) => {
                debug!("Dropping oversized frame ({} bytes)", frame.len());
                None
            }
        }
    }

    /// Payload with surrounding ASCII whitespace removed
    pub fn token(&self) -> &[u8] {
        self.0.trim_ascii()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for RadioMessage {
    // Payloads may be the credential; never print them
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RadioMessage({} bytes)", self.0.len())
    }
}

/// Packet radio polled once per tick
pub trait RadioLink {
    /// Take at most one pending message without blocking.
    ///
    /// Bus errors, CRC failures and oversized frames all read as `None`.
    fn try_receive(&mut self) -> Option<RadioMessage>;

    /// Transmit one packet.
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError>;
}
