//! File-backed counter store
//!
//! Keeps the encoded [`CounterTable`] in `counters.bin` under the state
//! directory. Every change is written to a temporary file, synced and then
//! renamed over the live file, so a crash mid-write leaves the previous table
//! intact. The directory is synced after the rename so the new entry itself
//! survives power loss.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use aegis_core::StoreError;
use aegis_core::storage::{CounterStore, CounterTable};
use log::debug;

const COUNTERS_FILE: &str = "counters.bin";
const COUNTERS_TEMP_FILE: &str = "counters.bin.tmp";

pub struct FileCounterStore {
    dir: PathBuf,
    /// Last table read from or written to disk
    cache: Option<CounterTable>,
}

impl FileCounterStore {
    /// Use `dir` for the counter file, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(StoreError::io)?;
        Ok(Self { dir, cache: None })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(COUNTERS_FILE)
    }

    fn load(&mut self) -> Result<&CounterTable, StoreError> {
        let table = match self.cache.take() {
            Some(table) => table,
            None => read_table(&self.path())?,
        };
        Ok(self.cache.insert(table))
    }

    fn commit(&mut self, table: CounterTable) -> Result<(), StoreError> {
        let bytes = table.to_bytes()?;
        let temp = self.dir.join(COUNTERS_TEMP_FILE);

        let mut file = File::create(&temp).map_err(StoreError::io)?;
        file.write_all(&bytes).map_err(StoreError::io)?;
        file.sync_all().map_err(StoreError::io)?;
        fs::rename(&temp, self.path()).map_err(StoreError::io)?;
        sync_dir(&self.dir).map_err(StoreError::io)?;

        debug!("Wrote {} byte counter table", bytes.len());
        self.cache = Some(table);
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

// Directories cannot be opened as files here; the rename is as durable as it gets
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn read_table(path: &Path) -> Result<CounterTable, StoreError> {
    match fs::read(path) {
        Ok(bytes) => CounterTable::from_bytes(&bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(CounterTable::new()),
        Err(e) => Err(StoreError::io(e)),
    }
}

impl CounterStore for FileCounterStore {
    fn get(&mut self, key: &str) -> Result<u32, StoreError> {
        Ok(self.load()?.get(key))
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        let mut table = self.load()?.clone();
        table.set(key, value);
        self.commit(table)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.commit(CounterTable::new())
    }
}
