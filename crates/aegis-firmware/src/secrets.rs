//! Station secrets baked in by `build.rs`
//!
//! Set `AEGIS_CREDENTIAL` (and optionally `AEGIS_FREQUENCY_HZ` and
//! `AEGIS_SYNC_WORD`) in `.env` before building. The fob must be built with
//! the same values.

use aegis_core::ConfigError;
use aegis_core::config::StationConfig;

const CREDENTIAL: &str = env!("AEGIS_CREDENTIAL");
const FREQUENCY_HZ: &str = env!("AEGIS_FREQUENCY_HZ");
const SYNC_WORD: &str = env!("AEGIS_SYNC_WORD");

fn non_empty(value: &'static str) -> Option<&'static str> {
    (!value.trim().is_empty()).then_some(value)
}

/// Validated station configuration for this build.
pub fn station_config() -> Result<StationConfig<'static>, ConfigError> {
    let mut config = StationConfig::new(CREDENTIAL);
    config.radio = config
        .radio
        .with_overrides(non_empty(FREQUENCY_HZ), non_empty(SYNC_WORD))?;
    config.validate()?;
    Ok(config)
}
