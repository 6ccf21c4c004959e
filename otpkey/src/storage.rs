//! File-backed credential store
//!
//! One directory holds one CBOR file per occupied record slot
//! (`record-NNN.cbor`) and the touch slot table (`slots.cbor`). Every write
//! goes to a temporary file that is synced and then renamed over the target,
//! so a crash leaves either the old file or the new one.

use crate::error::Result;

use otpkey_apdu::{CredentialRecord, CredentialStore, SlotTable, StatusCode, cbor};

use log::{error, info};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

const SLOTS_FILE: &str = "slots.cbor";

/// Durable credential store rooted at one directory
pub struct FileStore {
    dir: PathBuf,
    capacity: usize,
    /// Name held by each record slot
    index: Mutex<Vec<Option<Vec<u8>>>>,
    write_fault: AtomicBool,
}

fn storage_failure(err: io::Error) -> StatusCode {
    error!("storage I/O failure: {}", err);
    StatusCode::Unknown
}

impl FileStore {
    /// Open or create a store with `capacity` record slots
    pub fn open(dir: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut index = vec![None; capacity];
        for (slot, entry) in index.iter_mut().enumerate() {
            let path = record_path(&dir, slot);
            if !path.exists() {
                continue;
            }
            let record: CredentialRecord = cbor::decode(&fs::read(&path)?)?;
            *entry = Some(record.name);
        }
        let live = index.iter().flatten().count();
        info!("opened store at {} ({} of {} slots used)", dir.display(), live, capacity);

        Ok(Self {
            dir,
            capacity,
            index: Mutex::new(index),
            write_fault: AtomicBool::new(false),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fail every later write as a dying flash part would, until cleared
    pub fn inject_write_fault(&self, enabled: bool) {
        info!("write fault injection {}", if enabled { "on" } else { "off" });
        self.write_fault.store(enabled, Ordering::SeqCst);
    }

    fn check_write(&self) -> otpkey_apdu::Result<()> {
        if self.write_fault.load(Ordering::SeqCst) {
            return Err(storage_failure(io::Error::other("injected write fault")));
        }
        Ok(())
    }

    fn index(&self) -> otpkey_apdu::Result<std::sync::MutexGuard<'_, Vec<Option<Vec<u8>>>>> {
        self.index.lock().map_err(|_| {
            error!("store index lock poisoned");
            StatusCode::Unknown
        })
    }

    fn read_record(&self, slot: usize) -> otpkey_apdu::Result<CredentialRecord> {
        let bytes = fs::read(record_path(&self.dir, slot)).map_err(storage_failure)?;
        cbor::decode(&bytes)
    }
}

fn record_path(dir: &Path, slot: usize) -> PathBuf {
    dir.join(format!("record-{:03}.cbor", slot))
}

/// Replace `path` with `bytes` through a synced temporary file
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl CredentialStore for FileStore {
    fn get(&self, name: &[u8]) -> otpkey_apdu::Result<Option<CredentialRecord>> {
        let slot = self
            .index()?
            .iter()
            .position(|entry| entry.as_deref() == Some(name));
        slot.map(|slot| self.read_record(slot)).transpose()
    }

    fn put(&self, record: &CredentialRecord) -> otpkey_apdu::Result<()> {
        self.check_write()?;
        let bytes = cbor::encode(record)?;
        let mut index = self.index()?;
        let slot = index
            .iter()
            .position(|entry| entry.as_deref() == Some(record.name.as_slice()))
            .or_else(|| index.iter().position(Option::is_none))
            .ok_or(StatusCode::NotEnoughSpace)?;

        write_atomic(&record_path(&self.dir, slot), &bytes).map_err(storage_failure)?;
        index[slot] = Some(record.name.clone());
        Ok(())
    }

    fn delete(&self, name: &[u8]) -> otpkey_apdu::Result<()> {
        self.check_write()?;
        let mut index = self.index()?;
        let Some(slot) = index.iter().position(|entry| entry.as_deref() == Some(name)) else {
            return Ok(());
        };
        remove_if_present(&record_path(&self.dir, slot)).map_err(storage_failure)?;
        index[slot] = None;
        Ok(())
    }

    fn iterate(&self) -> otpkey_apdu::Result<Vec<CredentialRecord>> {
        let index = self.index()?;
        index
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_some())
            .map(|(slot, _)| self.read_record(slot))
            .collect()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn count(&self) -> otpkey_apdu::Result<usize> {
        Ok(self.index()?.iter().flatten().count())
    }

    fn load_slots(&self) -> otpkey_apdu::Result<Option<SlotTable>> {
        match fs::read(self.dir.join(SLOTS_FILE)) {
            Ok(bytes) => cbor::decode(&bytes).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_failure(err)),
        }
    }

    fn save_slots(&self, slots: &SlotTable) -> otpkey_apdu::Result<()> {
        self.check_write()?;
        let bytes = cbor::encode(slots)?;
        write_atomic(&self.dir.join(SLOTS_FILE), &bytes).map_err(storage_failure)
    }

    fn reset(&self) -> otpkey_apdu::Result<()> {
        self.check_write()?;
        let mut index = self.index()?;
        for (slot, entry) in index.iter_mut().enumerate() {
            remove_if_present(&record_path(&self.dir, slot)).map_err(storage_failure)?;
            *entry = None;
        }
        remove_if_present(&self.dir.join(SLOTS_FILE)).map_err(storage_failure)?;
        info!("store at {} wiped", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otpkey_apdu::{Algorithm, Gesture, Properties, Secret, SlotKind, TouchSlot};

    fn record(name: &[u8]) -> CredentialRecord {
        CredentialRecord {
            name: name.to_vec(),
            algorithm: Algorithm::from_u8(0x11).unwrap(),
            digits: 6,
            secret: Secret::from_slice(b"12345678901234567890"),
            counter: 7,
            properties: Properties::from_bits(Properties::INCREASING_ONLY),
        }
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), 4).unwrap();
            store.put(&record(b"a")).unwrap();
            store.put(&record(b"b")).unwrap();
            store.delete(b"a").unwrap();
            store.put(&record(b"c")).unwrap();
        }

        let store = FileStore::open(dir.path(), 4).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        let names: Vec<_> = store.iterate().unwrap().into_iter().map(|r| r.name).collect();
        // "c" reused the slot "a" freed
        assert_eq!(names, vec![b"c".to_vec(), b"b".to_vec()]);
        assert_eq!(store.get(b"b").unwrap(), Some(record(b"b")));
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 2).unwrap();
        store.put(&record(b"a")).unwrap();
        store.put(&record(b"b")).unwrap();
        assert_eq!(store.put(&record(b"c")), Err(StatusCode::NotEnoughSpace));

        // Replacing in place needs no free slot
        let mut updated = record(b"b");
        updated.counter = 9;
        store.put(&updated).unwrap();
        assert_eq!(store.get(b"b").unwrap().unwrap().counter, 9);
    }

    #[test]
    fn test_slots_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 2).unwrap();
        assert_eq!(store.load_slots().unwrap(), None);

        let mut table = SlotTable::default();
        *table.get_mut(Gesture::Long) = TouchSlot {
            kind: SlotKind::Static {
                password: Secret::from_slice(b"pw"),
            },
            with_enter: true,
        };
        store.save_slots(&table).unwrap();
        store.put(&record(b"a")).unwrap();

        let reopened = FileStore::open(dir.path(), 2).unwrap();
        assert_eq!(reopened.load_slots().unwrap(), Some(table));

        reopened.reset().unwrap();
        assert_eq!(reopened.count().unwrap(), 0);
        assert_eq!(reopened.load_slots().unwrap(), None);
        assert!(!dir.path().join("record-000.cbor").exists());
    }

    #[test]
    fn test_injected_write_fault() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 2).unwrap();
        store.put(&record(b"a")).unwrap();

        store.inject_write_fault(true);
        let mut updated = record(b"a");
        updated.counter = 8;
        assert_eq!(store.put(&updated), Err(StatusCode::Unknown));
        assert_eq!(store.delete(b"a"), Err(StatusCode::Unknown));
        assert_eq!(store.save_slots(&SlotTable::default()), Err(StatusCode::Unknown));
        assert_eq!(store.get(b"a").unwrap().unwrap().counter, 7);

        store.inject_write_fault(false);
        store.put(&updated).unwrap();
        let reopened = FileStore::open(dir.path(), 2).unwrap();
        assert_eq!(reopened.get(b"a").unwrap().unwrap().counter, 8);
    }
}
