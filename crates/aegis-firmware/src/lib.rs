//! ESP32-S3 firmware-specific modules for aegis
//!
//! This crate contains the pieces that only make sense on the device: secrets
//! baked in at build time and the SD card's notion of time.

#![no_std]

pub mod clock;
pub mod secrets;
