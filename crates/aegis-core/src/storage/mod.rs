//! Durable key to counter storage
//!
//! The violation counter has to survive power loss, so every backend must
//! make a successful [`CounterStore::set`] durable before returning. A key
//! that was never written reads as 0.

pub mod memory;
pub mod sd_card;
pub mod table;

pub use memory::MemoryCounterStore;
pub use sd_card::SdCardCounterStore;
pub use table::CounterTable;

use crate::app_state::StoreError;

/// Durable store of named non-negative counters
pub trait CounterStore {
    /// Current value of `key`, 0 if it was never written.
    fn get(&mut self, key: &str) -> Result<u32, StoreError>;

    /// Durably record `value` for `key`.
    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError>;

    /// Remove every key.
    fn clear(&mut self) -> Result<(), StoreError>;
}

impl<S: CounterStore + ?Sized> CounterStore for &mut S {
    fn get(&mut self, key: &str) -> Result<u32, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
