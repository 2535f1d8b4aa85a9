//! In-memory radio pair
//!
//! Links a station and a key fob without hardware. Frames travel as raw bytes
//! and go through the same [`RadioMessage::from_frame`] checks as frames read
//! off the SX127x FIFO.

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::app_state::RadioError;

use super::{MAX_FRAME_LEN, RadioLink, RadioMessage};

type Air = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// One end of an in-memory link
pub struct LoopbackRadio {
    inbound: Air,
    outbound: Air,
}

impl LoopbackRadio {
    /// Two connected ends: whatever one sends, the other receives.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Air = Rc::default();
        let b_to_a: Air = Rc::default();
        (
            Self {
                inbound: Rc::clone(&b_to_a),
                outbound: Rc::clone(&a_to_b),
            },
            Self {
                inbound: a_to_b,
                outbound: b_to_a,
            },
        )
    }

    /// Put a raw frame on the air towards this end, bypassing the peer.
    ///
    /// Used to inject interference and malformed frames.
    pub fn inject(&self, frame: &[u8]) {
        self.inbound.borrow_mut().push_back(frame.to_vec());
    }

    /// Frames waiting to be received by this end
    pub fn pending(&self) -> usize {
        self.inbound.borrow().len()
    }
}

impl RadioLink for LoopbackRadio {
    fn try_receive(&mut self) -> Option<RadioMessage> {
        // One frame per call, like the hardware FIFO; an oversized one is consumed and dropped
        let frame = self.inbound.borrow_mut().pop_front()?;
        RadioMessage::from_frame(&frame)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(RadioError::PayloadTooLarge { len: payload.len() });
        }
        self.outbound.borrow_mut().push_back(payload.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_cross_to_the_peer_in_order() {
        let (mut station, mut fob) = LoopbackRadio::pair();
        fob.send(b"one").unwrap();
        fob.send(b"two").unwrap();

        assert!(fob.try_receive().is_none());
        assert_eq!(station.try_receive().unwrap().token(), b"one");
        assert_eq!(station.try_receive().unwrap().token(), b"two");
        assert!(station.try_receive().is_none());
    }

    #[test]
    fn oversized_frame_is_consumed_without_a_message() {
        let (mut station, _fob) = LoopbackRadio::pair();
        station.inject(&[b'x'; MAX_FRAME_LEN + 1]);
        station.inject(b"admin");

        assert!(station.try_receive().is_none());
        assert_eq!(station.pending(), 1);
        assert_eq!(station.try_receive().unwrap().token(), b"admin");
    }

    #[test]
    fn full_size_binary_frame_is_delivered() {
        let (mut station, _fob) = LoopbackRadio::pair();
        station.inject(&[0xFF; MAX_FRAME_LEN]);

        assert_eq!(station.try_receive().unwrap().len(), MAX_FRAME_LEN);
    }

    #[test]
    fn send_refuses_frames_beyond_packet_size() {
        let (_station, mut fob) = LoopbackRadio::pair();
        assert_eq!(
            fob.send(&[b'x'; MAX_FRAME_LEN + 1]),
            Err(RadioError::PayloadTooLarge {
                len: MAX_FRAME_LEN + 1
            })
        );
    }
}
