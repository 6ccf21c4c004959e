//! Persistence and platform capabilities consumed by the applications
//!
//! The engine never talks to flash or a filesystem directly. It is handed a
//! [`CredentialStore`] and a [`Clock`]; tests substitute [`MemoryStore`] and a
//! fixed clock.

use crate::cbor;
use crate::status::{Result, StatusCode};
use crate::types::{CredentialRecord, SlotTable};

use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

/// Durable credential storage
///
/// Each write must be atomic: after a power loss a record is either the old
/// version or the new one, never a mix. Implementations synchronize
/// internally so all methods take `&self`.
pub trait CredentialStore {
    /// Look a record up by name
    fn get(&self, name: &[u8]) -> Result<Option<CredentialRecord>>;

    /// Insert or replace the record with the same name
    ///
    /// Returns `NotEnoughSpace` when inserting and every slot is taken.
    fn put(&self, record: &CredentialRecord) -> Result<()>;

    /// Remove a record; removing an absent name succeeds
    fn delete(&self, name: &[u8]) -> Result<()>;

    /// All live records, in an order that is stable between mutations
    fn iterate(&self) -> Result<Vec<CredentialRecord>>;

    /// Number of record slots
    fn capacity(&self) -> usize;

    /// Number of live records
    fn count(&self) -> Result<usize>;

    /// Touch slot table, `None` if it was never written
    fn load_slots(&self) -> Result<Option<SlotTable>>;

    fn save_slots(&self, slots: &SlotTable) -> Result<()>;

    /// Wipe every record and the slot table
    fn reset(&self) -> Result<()>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn get(&self, name: &[u8]) -> Result<Option<CredentialRecord>> {
        (**self).get(name)
    }

    fn put(&self, record: &CredentialRecord) -> Result<()> {
        (**self).put(record)
    }

    fn delete(&self, name: &[u8]) -> Result<()> {
        (**self).delete(name)
    }

    fn iterate(&self) -> Result<Vec<CredentialRecord>> {
        (**self).iterate()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }

    fn load_slots(&self) -> Result<Option<SlotTable>> {
        (**self).load_slots()
    }

    fn save_slots(&self, slots: &SlotTable) -> Result<()> {
        (**self).save_slots(slots)
    }

    fn reset(&self) -> Result<()> {
        (**self).reset()
    }
}

/// Wall-clock source for TOTP
pub trait Clock {
    /// Seconds since the Unix epoch
    fn unix_time(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn unix_time(&self) -> u64 {
        (**self).unix_time()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn unix_time(&self) -> u64 {
        self.0
    }
}

/// RAM-backed store with a fixed number of record slots
///
/// Records are kept CBOR-encoded, exactly as a flash-backed store would hold
/// them, so encoding faults show up in tests.
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

struct MemoryInner {
    records: Vec<Option<Vec<u8>>>,
    slots: Option<Vec<u8>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        let mut records = Vec::with_capacity(capacity);
        records.resize_with(capacity, || None);
        Self {
            inner: Mutex::new(MemoryInner {
                records,
                slots: None,
            }),
        }
    }
}

impl MemoryInner {
    fn position(&self, name: &[u8]) -> Result<Option<usize>> {
        for (index, blob) in self.records.iter().enumerate() {
            if let Some(blob) = blob {
                let record: CredentialRecord = cbor::decode(blob)?;
                if record.name == name {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, name: &[u8]) -> Result<Option<CredentialRecord>> {
        let inner = self.inner.lock();
        match inner.position(name)? {
            Some(index) => match &inner.records[index] {
                Some(blob) => cbor::decode(blob).map(Some),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn put(&self, record: &CredentialRecord) -> Result<()> {
        let blob = cbor::encode(record)?;
        let mut inner = self.inner.lock();
        let index = match inner.position(&record.name)? {
            Some(index) => index,
            None => inner
                .records
                .iter()
                .position(Option::is_none)
                .ok_or(StatusCode::NotEnoughSpace)?,
        };
        inner.records[index] = Some(blob);
        Ok(())
    }

    fn delete(&self, name: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.position(name)? {
            inner.records[index] = None;
        }
        Ok(())
    }

    fn iterate(&self) -> Result<Vec<CredentialRecord>> {
        let inner = self.inner.lock();
        inner
            .records
            .iter()
            .flatten()
            .map(|blob| cbor::decode(blob))
            .collect()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().records.len()
    }

    fn count(&self) -> Result<usize> {
        Ok(self.inner.lock().records.iter().flatten().count())
    }

    fn load_slots(&self) -> Result<Option<SlotTable>> {
        let inner = self.inner.lock();
        inner.slots.as_deref().map(|blob| cbor::decode(blob)).transpose()
    }

    fn save_slots(&self, slots: &SlotTable) -> Result<()> {
        let blob = cbor::encode(slots)?;
        self.inner.lock().slots = Some(blob);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.records.iter_mut().for_each(|slot| *slot = None);
        inner.slots = None;
        Ok(())
    }
}

/// `MemoryStore` whose writes fail on demand, like worn-out flash
#[cfg(test)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failing: core::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl FlakyStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: MemoryStore::new(capacity),
            failing: core::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every later write fail with `Unknown`, or succeed again
    pub(crate) fn fail_writes(&self, failing: bool) {
        self.failing
            .store(failing, core::sync::atomic::Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.failing.load(core::sync::atomic::Ordering::SeqCst) {
            return Err(StatusCode::Unknown);
        }
        Ok(())
    }
}

#[cfg(test)]
impl CredentialStore for FlakyStore {
    fn get(&self, name: &[u8]) -> Result<Option<CredentialRecord>> {
        self.inner.get(name)
    }

    fn put(&self, record: &CredentialRecord) -> Result<()> {
        self.check_write()?;
        self.inner.put(record)
    }

    fn delete(&self, name: &[u8]) -> Result<()> {
        self.check_write()?;
        self.inner.delete(name)
    }

    fn iterate(&self) -> Result<Vec<CredentialRecord>> {
        self.inner.iterate()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn count(&self) -> Result<usize> {
        self.inner.count()
    }

    fn load_slots(&self) -> Result<Option<SlotTable>> {
        self.inner.load_slots()
    }

    fn save_slots(&self, slots: &SlotTable) -> Result<()> {
        self.check_write()?;
        self.inner.save_slots(slots)
    }

    fn reset(&self) -> Result<()> {
        self.check_write()?;
        self.inner.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Secret;
    use crate::types::{Algorithm, Gesture, OtpKind, Properties, SlotKind};
    use otpkey_crypto::HashAlgorithm;

    fn record(name: &[u8]) -> CredentialRecord {
        CredentialRecord {
            name: name.to_vec(),
            algorithm: Algorithm::new(OtpKind::Totp, HashAlgorithm::Sha1),
            digits: 6,
            secret: Secret::from_slice(&[0, 1, 2]),
            counter: 0,
            properties: Properties::default(),
        }
    }

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new(4);
        store.put(&record(b"a")).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(record(b"a")));
        assert_eq!(store.get(b"b").unwrap(), None);

        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        // Absent name
        store.delete(b"a").unwrap();
    }

    #[test]
    fn test_put_replaces_in_place() {
        let store = MemoryStore::new(2);
        store.put(&record(b"a")).unwrap();
        store.put(&record(b"b")).unwrap();

        let mut updated = record(b"a");
        updated.counter = 9;
        store.put(&updated).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        let names: Vec<_> = store.iterate().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(store.get(b"a").unwrap().unwrap().counter, 9);
    }

    #[test]
    fn test_capacity() {
        let store = MemoryStore::new(2);
        store.put(&record(b"a")).unwrap();
        store.put(&record(b"b")).unwrap();
        assert_eq!(store.put(&record(b"c")), Err(StatusCode::NotEnoughSpace));

        store.delete(b"a").unwrap();
        store.put(&record(b"c")).unwrap();
        // Freed slot is reused, order follows slots
        let names: Vec<_> = store.iterate().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec![b"c".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_slots_and_reset() {
        let store = MemoryStore::new(2);
        assert_eq!(store.load_slots().unwrap(), None);

        let mut table = SlotTable::default();
        table.get_mut(Gesture::Short).kind = SlotKind::Oath {
            name: b"a".to_vec(),
        };
        store.save_slots(&table).unwrap();
        store.put(&record(b"a")).unwrap();
        assert_eq!(store.load_slots().unwrap(), Some(table));

        store.reset().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.load_slots().unwrap(), None);
        assert_eq!(store.capacity(), 2);
    }

    #[test]
    fn test_flaky_store_reads_through_failures() {
        let store = FlakyStore::new(2);
        store.put(&record(b"a")).unwrap();
        store.fail_writes(true);
        assert_eq!(store.put(&record(b"b")), Err(StatusCode::Unknown));
        assert_eq!(store.delete(b"a"), Err(StatusCode::Unknown));
        assert_eq!(store.get(b"a").unwrap(), Some(record(b"a")));
        assert_eq!(store.count().unwrap(), 1);

        store.fail_writes(false);
        store.put(&record(b"b")).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }
}
