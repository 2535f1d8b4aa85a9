use core::str::FromStr;

use crate::app_state::ConfigError;
use crate::radio::RadioMessage;

/// Longest configured secret, in bytes after trimming
pub const MAX_CREDENTIAL_LEN: usize = 64;

/// Shared secret compared against inbound radio payloads
///
/// Comparison is exact and case-sensitive on the payload with ASCII whitespace
/// trimmed.
/// The whole payload is the token; there is no command framing.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(heapless::String<MAX_CREDENTIAL_LEN>);

impl Credential {
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        let trimmed = secret.trim_ascii();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyCredential);
        }
        heapless::String::from_str(trimmed)
            .map(Self)
            .map_err(|_| ConfigError::CredentialTooLong { len: trimmed.len() })
    }

    pub fn matches(&self, message: &RadioMessage) -> bool {
        message.token() == self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(..)")
    }
}
