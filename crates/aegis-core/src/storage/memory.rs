use crate::app_state::StoreError;

use super::{CounterStore, CounterTable};

/// Volatile counter store
///
/// Holds the same table the durable backends persist. Moving it out of a
/// state machine and booting a new one from it models a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCounterStore {
    table: CounterTable,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            table: CounterTable::new(),
        }
    }

    /// Store pre-loaded with `value` under `key`
    pub fn with_value(key: &str, value: u32) -> Self {
        let mut table = CounterTable::new();
        table.set(key, value);
        Self { table }
    }

    pub fn table(&self) -> &CounterTable {
        &self.table
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&mut self, key: &str) -> Result<u32, StoreError> {
        Ok(self.table.get(key))
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        self.table.set(key, value);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.table = CounterTable::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let mut store = MemoryCounterStore::new();
        assert_eq!(store.get("fails"), Ok(0));
        store.set("fails", 2).unwrap();
        assert_eq!(store.get("fails"), Ok(2));
    }

    #[test]
    fn clear_removes_all_keys() {
        let mut store = MemoryCounterStore::with_value("fails", 3);
        store.set("other", 9).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get("fails"), Ok(0));
        assert!(store.table().is_empty());
    }
}
