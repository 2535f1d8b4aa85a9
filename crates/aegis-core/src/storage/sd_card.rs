//! Counter store on a FAT-formatted SD card
//!
//! The table is written alternately to two slot files so a power cut in the
//! middle of a write leaves the previous slot intact. Each slot is:
//!
//! - generation: 4 bytes (u32, little-endian), incremented on every write
//! - table: postcard-encoded [`CounterTable`]
//!
//! On load the newest slot that decodes wins. A slot that exists but cannot
//! be decoded is skipped; if no slot decodes but at least one exists the
//! store reports [`StoreError::Corrupt`] instead of pretending it is empty.

extern crate alloc;
use alloc::vec::Vec;

use embedded_sdmmc::{BlockDevice, Error, Mode, TimeSource, VolumeIdx, VolumeManager};
use log::{debug, warn};

use crate::app_state::StoreError;

use super::{CounterStore, CounterTable};

const SLOT_FILES: [&str; 2] = ["COUNTA.BIN", "COUNTB.BIN"];

const GENERATION_LEN: usize = 4;

/// A decoded slot: its generation and table
type Slot = (u32, CounterTable);

/// Raw contents of one slot file, `None` if the file does not exist
type SlotBytes = Option<Vec<u8>>;

/// SD card operations are blocking, like every other SPI user on the board.
pub struct SdCardCounterStore<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: VolumeManager<D, T, 4, 4, 1>,
    /// Last committed table, its generation and slot index
    cache: Option<(u32, usize, CounterTable)>,
}

impl<D, T> SdCardCounterStore<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    pub fn new(block_device: D, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(block_device, ts),
            cache: None,
        }
    }

    fn read_slot(&self, file_name: &str) -> Result<SlotBytes, Error<D::Error>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let file = match root_dir.open_file_in_dir(file_name, Mode::ReadOnly) {
            Ok(file) => file,
            Err(Error::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut contents = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let read = file.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            contents.extend_from_slice(&chunk[..read]);
        }

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(Some(contents))
    }

    fn write_slot(&self, file_name: &str, contents: &[u8]) -> Result<(), Error<D::Error>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(file_name, Mode::ReadWriteCreateOrTruncate)?;

        file.write(contents)?;

        // Closing flushes the directory entry; the write is only durable after this
        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }

    /// Load the newest slot, reading the card on first use only.
    fn load(&mut self) -> Result<&(u32, usize, CounterTable), StoreError> {
        if self.cache.is_none() {
            let a = self.read_slot(SLOT_FILES[0]).map_err(StoreError::io)?;
            let b = self.read_slot(SLOT_FILES[1]).map_err(StoreError::io)?;
            let loaded = newest_slot([a, b])?;
            debug!(
                "Counter table loaded from slot {} (generation {})",
                loaded.1, loaded.0
            );
            self.cache = Some(loaded);
        }
        self.cache.as_ref().ok_or(StoreError::Unavailable)
    }

    /// Write `table` to the slot not holding the current generation.
    fn commit(&mut self, table: CounterTable) -> Result<(), StoreError> {
        let (generation, slot) = {
            let (generation, slot, _) = self.load()?;
            (*generation, *slot)
        };
        let next_generation = generation.wrapping_add(1);
        let next_slot = 1 - slot;

        let contents = encode_slot(next_generation, &table)?;
        self.write_slot(SLOT_FILES[next_slot], &contents)
            .map_err(StoreError::io)?;

        self.cache = Some((next_generation, next_slot, table));
        Ok(())
    }
}

impl<D, T> CounterStore for SdCardCounterStore<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    fn get(&mut self, key: &str) -> Result<u32, StoreError> {
        Ok(self.load()?.2.get(key))
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError> {
        let mut table = self.load()?.2.clone();
        table.set(key, value);
        self.commit(table)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let loaded = self.load().map(|_| ());
        match loaded {
            Ok(()) => self.commit(CounterTable::new()),
            Err(e) => {
                // Neither slot can be trusted to lose a generation race, so overwrite both
                warn!("Clearing counter store over unreadable slots: {}", e);
                let empty = CounterTable::new();
                for (generation, file_name) in (0u32..).zip(SLOT_FILES) {
                    let contents = encode_slot(generation, &empty)?;
                    self.write_slot(file_name, &contents)
                        .map_err(StoreError::io)?;
                }
                self.cache = Some((1, 1, empty));
                Ok(())
            }
        }
    }
}

fn encode_slot(generation: u32, table: &CounterTable) -> Result<Vec<u8>, StoreError> {
    let mut contents = Vec::with_capacity(GENERATION_LEN + 16);
    contents.extend_from_slice(&generation.to_le_bytes());
    contents.extend_from_slice(&table.to_bytes()?);
    Ok(contents)
}

fn decode_slot(bytes: &[u8]) -> Option<Slot> {
    // A generation with no table behind it is a torn write, not an empty table
    if bytes.len() <= GENERATION_LEN {
        return None;
    }
    let (generation, table) = bytes.split_at(GENERATION_LEN);
    let generation = u32::from_le_bytes([generation[0], generation[1], generation[2], generation[3]]);
    CounterTable::from_bytes(table)
        .ok()
        .map(|table| (generation, table))
}

/// Pick the newest decodable slot as `(generation, slot index, table)`.
///
/// No slot files at all is a fresh card: generation 0 in slot 1, so the
/// first write lands in slot 0.
fn newest_slot(slots: [SlotBytes; 2]) -> Result<(u32, usize, CounterTable), StoreError> {
    let mut any_present = false;
    let mut newest: Option<(u32, usize, CounterTable)> = None;

    for (index, bytes) in slots.iter().enumerate() {
        let Some(bytes) = bytes else { continue };
        any_present = true;

        match decode_slot(bytes) {
            Some((generation, table)) => {
                let newer = newest
                    .as_ref()
                    .is_none_or(|(current, _, _)| generation_after(generation, *current));
                if newer {
                    newest = Some((generation, index, table));
                }
            }
            None => warn!("Skipping undecodable counter slot {}", SLOT_FILES[index]),
        }
    }

    match newest {
        Some(slot) => Ok(slot),
        None if any_present => Err(StoreError::Corrupt),
        None => Ok((0, 1, CounterTable::new())),
    }
}

/// Serial-number comparison so the generation can wrap.
fn generation_after(candidate: u32, current: u32) -> bool {
    let distance = candidate.wrapping_sub(current);
    distance != 0 && distance < u32::MAX / 2
}
