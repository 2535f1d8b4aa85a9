//! Persisted counter table format
//!
//! Binary layout (postcard):
//! - version: 1 byte (currently 1)
//! - entries: varint length, then (varint-prefixed UTF-8 key, varint u32) pairs
//!
//! Backends rewrite the whole table on every change; it holds a handful of
//! keys, so the encoded size stays in the tens of bytes.

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::app_state::StoreError;

/// Current on-disk format version
pub const TABLE_VERSION: u8 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CounterTable {
    version: u8,
    entries: BTreeMap<String, u32>,
}

impl CounterTable {
    pub fn new() -> Self {
        Self {
            version: TABLE_VERSION,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> u32 {
        self.entries.get(key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: &str, value: u32) {
        self.entries.insert(String::from(key), value);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        postcard::to_allocvec(self).map_err(|_| StoreError::Corrupt)
    }

    /// Decode a persisted table. An empty buffer is an empty table.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        let table: Self = postcard::from_bytes(bytes).map_err(|_| StoreError::Corrupt)?;
        if table.version != TABLE_VERSION {
            return Err(StoreError::Corrupt);
        }
        Ok(table)
    }
}
