//! Key fob transmitter
//!
//! The fob has no state machine: a button press sends the credential and an
//! operator-typed console line is sent verbatim (trimmed). It never listens
//! for a reply because the station never sends one.

use log::debug;

use crate::app_state::RadioError;
use crate::radio::RadioLink;
use crate::security::Credential;

pub struct KeyFob<R> {
    radio: R,
    credential: Credential,
}

impl<R: RadioLink> KeyFob<R> {
    pub fn new(radio: R, credential: Credential) -> Self {
        Self { radio, credential }
    }

    /// Fob button: transmit the stored credential.
    pub fn press(&mut self) -> Result<(), RadioError> {
        debug!("Fob transmitting credential");
        self.radio.send(self.credential.as_str().as_bytes())
    }

    /// Transmit a console line. Blank lines are not sent.
    ///
    /// Returns whether anything went on air.
    pub fn send_line(&mut self, line: &str) -> Result<bool, RadioError> {
        let token = line.trim_ascii();
        if token.is_empty() {
            return Ok(false);
        }
        debug!("Fob transmitting {} byte console line", token.len());
        self.radio.send(token.as_bytes())?;
        Ok(true)
    }
}
