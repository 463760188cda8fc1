//! Checksummed record storage for the remap table and profile selector.
//!
//! Each record lives at a fixed offset in byte-addressable storage as
//! `{magic, declared length, payload, checksum}`. The checksum is a wrapping
//! byte sum over everything before it. A record that fails any validation
//! step reads as absent, never as a fatal error; callers fall back to
//! defaults. Clearing a record only destroys its magic byte.

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::StorageDriver;
use crate::topology::{LINE_COUNT, LineRemap, Profile};

/// Storage offset of the remap record.
pub const REMAP_OFFSET: usize = 0;

/// Storage offset of the profile record. Must not overlap the remap record.
pub const PROFILE_OFFSET: usize = 16;

const REMAP_MAGIC: u8 = b'M';
const PROFILE_MAGIC: u8 = b'P';

/// Value written over a cleared record's magic byte.
const CLEARED: u8 = 0xFF;

fn checksum(magic: u8, len: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(magic.wrapping_add(len), |sum, byte| sum.wrapping_add(*byte))
}

/// Write one storage cell, skipping cells that already hold the value.
///
/// Pure wear reduction; correctness never depends on the skip.
fn update<S: StorageDriver>(storage: &mut S, offset: usize, value: u8) {
    if storage.read(offset) != value {
        storage.write(offset, value);
    }
}

fn save_record<S: StorageDriver>(storage: &mut S, offset: usize, magic: u8, payload: &[u8]) {
    #[allow(clippy::cast_possible_truncation)]
    let len = payload.len() as u8;
    update(storage, offset, magic);
    update(storage, offset + 1, len);
    for (i, byte) in payload.iter().enumerate() {
        update(storage, offset + 2 + i, *byte);
    }
    update(
        storage,
        offset + 2 + payload.len(),
        checksum(magic, len, payload),
    );
}

/// Read a record's payload back into `payload`.
///
/// Returns `false` when magic, declared length, or checksum do not match.
/// `payload` may hold partial data after a failed read; callers pass
/// scratch buffers, never live state.
fn load_record<S: StorageDriver>(
    storage: &mut S,
    offset: usize,
    magic: u8,
    payload: &mut [u8],
) -> bool {
    if storage.read(offset) != magic {
        return false;
    }
    #[allow(clippy::cast_possible_truncation)]
    let expected_len = payload.len() as u8;
    let len = storage.read(offset + 1);
    if len != expected_len {
        return false;
    }
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = storage.read(offset + 2 + i);
    }
    let stored = storage.read(offset + 2 + payload.len());
    stored == checksum(magic, len, payload)
}

fn clear_record<S: StorageDriver>(storage: &mut S, offset: usize) {
    update(storage, offset, CLEARED);
}

/// Persist the remap table.
pub fn save_remap<S: StorageDriver>(storage: &mut S, remap: &LineRemap) {
    save_record(storage, REMAP_OFFSET, REMAP_MAGIC, remap.as_bytes());
}

/// Load the persisted remap table, if a valid record exists.
///
/// Validates the record envelope and that every payload byte names a legal
/// physical line. Returns `None` otherwise; the caller keeps its in-memory
/// state and rebuilds nothing until told to.
pub fn load_remap<S: StorageDriver>(storage: &mut S) -> Option<LineRemap> {
    let mut payload = [0u8; LINE_COUNT];
    if !load_record(storage, REMAP_OFFSET, REMAP_MAGIC, &mut payload) {
        #[cfg(feature = "esp32-log")]
        println!("persist: no valid remap record");
        return None;
    }
    let mut remap = LineRemap::identity();
    if !remap.apply_bytes(&payload) {
        #[cfg(feature = "esp32-log")]
        println!("persist: remap record holds out-of-range line");
        return None;
    }
    Some(remap)
}

/// Drop the remap record by destroying its magic byte.
pub fn clear_remap<S: StorageDriver>(storage: &mut S) {
    clear_record(storage, REMAP_OFFSET);
}

/// Persist the profile selector.
pub fn save_profile<S: StorageDriver>(storage: &mut S, profile: Profile) {
    save_record(storage, PROFILE_OFFSET, PROFILE_MAGIC, &[profile.as_raw()]);
}

/// Load the persisted profile selector, if a valid record exists.
pub fn load_profile<S: StorageDriver>(storage: &mut S) -> Option<Profile> {
    let mut payload = [0u8; 1];
    if !load_record(storage, PROFILE_OFFSET, PROFILE_MAGIC, &mut payload) {
        #[cfg(feature = "esp32-log")]
        println!("persist: no valid profile record");
        return None;
    }
    Profile::from_raw(payload[0])
}

/// Drop the profile record by destroying its magic byte.
pub fn clear_profile<S: StorageDriver>(storage: &mut S) {
    clear_record(storage, PROFILE_OFFSET);
}
