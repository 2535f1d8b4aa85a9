//! Station configuration

use crate::app_state::ConfigError;
use crate::security::MAX_CREDENTIAL_LEN;

/// Carrier frequency used when none is configured (915 MHz ISM band)
pub const DEFAULT_FREQUENCY_HZ: u32 = 915_000_000;

/// Sync word shared by the station and its key fob
pub const DEFAULT_SYNC_WORD: u8 = 0xF3;

/// Channel parameters both radio ends must agree on out of band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub frequency_hz: u32,
    pub sync_word: u8,
    /// LoRa spreading factor, 6 to 12
    pub spreading_factor: u8,
    /// PA_BOOST output power, 2 to 17 dBm
    pub tx_power_dbm: u8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            sync_word: DEFAULT_SYNC_WORD,
            spreading_factor: 7,
            tx_power_dbm: 17,
        }
    }
}

impl RadioConfig {
    /// Apply string overrides as found in the environment or a `.env` file.
    ///
    /// `frequency_hz` is decimal; `sync_word` is hex with or without `0x`.
    /// Unset keys keep their defaults.
    pub fn with_overrides(
        mut self,
        frequency_hz: Option<&str>,
        sync_word: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = frequency_hz {
            self.frequency_hz = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "AEGIS_FREQUENCY_HZ",
            })?;
        }
        if let Some(raw) = sync_word {
            let raw = raw.trim();
            let digits = raw
                .strip_prefix("0x")
                .or_else(|| raw.strip_prefix("0X"))
                .unwrap_or(raw);
            self.sync_word = u8::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidValue {
                key: "AEGIS_SYNC_WORD",
            })?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationConfig<'a> {
    /// Shared secret the key fob transmits
    pub credential: &'a str,
    pub radio: RadioConfig,
    /// Consecutive stable samples before a button edge is reported
    pub debounce_ticks: u8,
    /// Control loop period
    pub tick_ms: u32,
    /// Samples the button must read held during the boot window to request a factory reset
    pub factory_reset_samples: u16,
}

impl<'a> StationConfig<'a> {
    pub const fn new(credential: &'a str) -> Self {
        Self {
            credential,
            radio: RadioConfig {
                frequency_hz: DEFAULT_FREQUENCY_HZ,
                sync_word: DEFAULT_SYNC_WORD,
                spreading_factor: 7,
                tx_power_dbm: 17,
            },
            debounce_ticks: 3,
            tick_ms: 20,
            factory_reset_samples: 50,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.credential.trim_ascii();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyCredential);
        }
        if trimmed.len() > MAX_CREDENTIAL_LEN {
            return Err(ConfigError::CredentialTooLong { len: trimmed.len() });
        }
        if self.debounce_ticks == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        Ok(())
    }
}
