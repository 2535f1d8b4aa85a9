//! Simulator configuration from the process environment
//!
//! | Variable             | Default          |
//! |----------------------|------------------|
//! | `AEGIS_CREDENTIAL`   | `aegis-dev`      |
//! | `AEGIS_FREQUENCY_HZ` | 915000000        |
//! | `AEGIS_SYNC_WORD`    | 0xF3             |
//! | `AEGIS_STATE_DIR`    | `./aegis-state`  |
//!
//! `--factory-reset` on the command line holds the station button through
//! the boot window.

use std::path::PathBuf;

use aegis_core::ConfigError;
use aegis_core::config::RadioConfig;

/// Credential used when none is configured; only good for the bench
pub const DEV_CREDENTIAL: &str = "aegis-dev";

const DEFAULT_STATE_DIR: &str = "aegis-state";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSettings {
    pub credential: String,
    pub radio: RadioConfig,
    pub state_dir: PathBuf,
    pub factory_reset: bool,
}

impl SimSettings {
    /// Build from a variable lookup and the command-line arguments (without
    /// the program name).
    pub fn load<F, I>(lookup: F, args: I) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = String>,
    {
        let mut factory_reset = false;
        for arg in args {
            match arg.as_str() {
                "--factory-reset" => factory_reset = true,
                _ => return Err(ConfigError::InvalidValue { key: "argument" }),
            }
        }

        let radio = RadioConfig::default().with_overrides(
            lookup("AEGIS_FREQUENCY_HZ").as_deref(),
            lookup("AEGIS_SYNC_WORD").as_deref(),
        )?;

        Ok(Self {
            credential: lookup("AEGIS_CREDENTIAL").unwrap_or_else(|| DEV_CREDENTIAL.to_string()),
            radio,
            state_dir: lookup("AEGIS_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            factory_reset,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }
}
