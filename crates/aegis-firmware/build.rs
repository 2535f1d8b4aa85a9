//! Bakes station secrets into the firmware image.
//!
//! Values come from the build environment or, failing that, a `.env` file in
//! this crate or any parent directory. Unset values are exported empty;
//! `secrets::station_config` rejects an empty credential at boot.

const KEYS: [&str; 3] = ["AEGIS_CREDENTIAL", "AEGIS_FREQUENCY_HZ", "AEGIS_SYNC_WORD"];

fn main() {
    match dotenvy::dotenv() {
        Ok(path) => println!("cargo:rerun-if-changed={}", path.display()),
        Err(e) if e.not_found() => println!("cargo:warning=no .env file, using the build environment"),
        Err(e) => panic!("failed to read .env: {e}"),
    }

    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_default();
        println!("cargo:rustc-env={key}={value}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
