//! Record log store.

use crate::error::{CoreError, CoreResult};
use crate::log::record::LogRecord;
use crate::record::RecordId;
use crate::types::SequenceNumber;
use parking_lot::RwLock;
use reldb_storage::StorageBackend;
use std::collections::HashMap;
use std::sync::Arc;

/// Manages the append-only record log and its in-memory lookup state.
///
/// Lookup state consists of a map from record id to the offset of its
/// latest entry, and a list of live ids in first-insertion order. Both
/// are derived from the log and rebuilt by [`RecordLog::rebuild`].
pub struct RecordLog {
    backend: Arc<RwLock<Box<dyn StorageBackend>>>,
    /// record id -> (offset of latest entry, sequence of that entry)
    offsets: RwLock<HashMap<RecordId, (u64, SequenceNumber)>>,
    /// Live ids in first-insertion order. Updates keep position;
    /// deletes remove.
    order: RwLock<Vec<RecordId>>,
}

impl RecordLog {
    /// Creates a record log over the given backend.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend: Arc::new(RwLock::new(backend)),
            offsets: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Appends an entry and updates lookup state.
    ///
    /// Returns the offset the entry was written at.
    pub fn append(&self, record: &LogRecord) -> CoreResult<u64> {
        let encoded = record.encode();
        let mut backend = self.backend.write();
        let offset = backend.append(&encoded)?;
        drop(backend);

        let mut offsets = self.offsets.write();
        let mut order = self.order.write();
        if record.is_tombstone() {
            offsets.remove(&record.record_id);
            order.retain(|id| *id != record.record_id);
        } else {
            if !offsets.contains_key(&record.record_id) {
                order.push(record.record_id);
            }
            offsets.insert(record.record_id, (offset, record.sequence));
        }

        Ok(offset)
    }

    /// Returns the latest payload for a live record, or `None`.
    pub fn get(&self, record_id: RecordId) -> CoreResult<Option<Vec<u8>>> {
        let Some(&(offset, _)) = self.offsets.read().get(&record_id) else {
            return Ok(None);
        };

        let record = self.read_at(offset)?;
        if record.is_tombstone() {
            return Ok(None);
        }
        Ok(Some(record.payload))
    }

    /// Returns whether a live record with this id exists.
    pub fn contains(&self, record_id: RecordId) -> bool {
        self.offsets.read().contains_key(&record_id)
    }

    /// Returns the live ids in first-insertion order.
    pub fn live_ids(&self) -> Vec<RecordId> {
        self.order.read().clone()
    }

    /// Returns the number of live records.
    pub fn len(&self) -> usize {
        self.offsets.read().len()
    }

    /// Returns whether the log holds no live records.
    pub fn is_empty(&self) -> bool {
        self.offsets.read().is_empty()
    }

    /// Reads and decodes the entry at a specific offset.
    pub fn read_at(&self, offset: u64) -> CoreResult<LogRecord> {
        let backend = self.backend.read();
        let size = backend.size()?;

        if offset + 4 > size {
            return Err(CoreError::log_corruption("offset beyond log"));
        }

        let len_bytes = backend.read_at(offset, 4)?;
        let record_len =
            u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

        if offset + record_len as u64 > size {
            return Err(CoreError::log_corruption("entry extends beyond log"));
        }

        let data = backend.read_at(offset, record_len)?;
        LogRecord::decode(&data)
    }

    /// Rebuilds lookup state by scanning the log from the start.
    ///
    /// A partial entry at the tail (a write torn by a crash) is
    /// truncated away; its operation is still in the WAL and will be
    /// replayed. A bad CRC before the tail is corruption and fails the
    /// rebuild.
    ///
    /// Returns the highest sequence number seen, which recovery uses to
    /// resume the sequence counter.
    pub fn rebuild(&self) -> CoreResult<SequenceNumber> {
        let mut offsets = HashMap::new();
        let mut order: Vec<RecordId> = Vec::new();
        let mut max_sequence = SequenceNumber::new(0);

        let mut backend = self.backend.write();
        let size = backend.size()?;
        let mut offset = 0u64;

        while offset + 4 <= size {
            let len_bytes = backend.read_at(offset, 4)?;
            let record_len =
                u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                    as usize;

            if offset + record_len as u64 > size {
                break;
            }

            let data = backend.read_at(offset, record_len)?;
            let record = LogRecord::decode(&data)?;

            if record.sequence > max_sequence {
                max_sequence = record.sequence;
            }
            if record.is_tombstone() {
                offsets.remove(&record.record_id);
                order.retain(|id| *id != record.record_id);
            } else {
                if !offsets.contains_key(&record.record_id) {
                    order.push(record.record_id);
                }
                offsets.insert(record.record_id, (offset, record.sequence));
            }

            offset += record_len as u64;
        }

        if offset < size {
            backend.truncate(offset)?;
        }
        drop(backend);

        *self.offsets.write() = offsets;
        *self.order.write() = order;
        Ok(max_sequence)
    }

    /// Flushes pending writes to durable storage.
    pub fn flush(&self) -> CoreResult<()> {
        self.backend.write().flush()?;
        Ok(())
    }

    /// Syncs the log to disk.
    pub fn sync(&self) -> CoreResult<()> {
        self.backend.write().sync()?;
        Ok(())
    }

    /// Returns the current log size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.read().size()?)
    }
}

impl std::fmt::Debug for RecordLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLog")
            .field("live_records", &self.len())
            .finish_non_exhaustive()
    }
}
