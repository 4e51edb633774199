//! WAL writer.

use crate::error::{CoreError, CoreResult};
use crate::wal::reader::WalReader;
use crate::wal::record::{compute_crc32, WalRecord, WAL_MAGIC, WAL_VERSION};
use parking_lot::Mutex;
use reldb_storage::StorageBackend;
use std::sync::Arc;

/// Envelope header size: magic (4) + version (2) + type (1) + length (4).
const HEADER_SIZE: usize = 11;

/// Trailing CRC size.
const CRC_SIZE: usize = 4;

/// Append-only writer over the WAL backend.
///
/// Each record is framed with a fixed envelope and a trailing CRC32 so
/// the reader can detect both torn tails and interior corruption.
///
/// With `sync_on_write` set, every append is fsynced and committed
/// records survive power loss. Without it, records survive a process
/// crash once flushed; power-loss durability comes only from the
/// explicit syncs at checkpoint and close.
pub struct WalManager {
    backend: Arc<Mutex<Box<dyn StorageBackend>>>,
    sync_on_write: bool,
}

impl WalManager {
    /// Creates a new WAL manager over the given backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            sync_on_write,
        }
    }

    /// Appends a record, returning the offset it was written at.
    pub fn append(&self, record: &WalRecord) -> CoreResult<u64> {
        let payload = record.encode_payload()?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&WAL_MAGIC);
        data.extend_from_slice(&WAL_VERSION.to_le_bytes());
        data.push(record.record_type().as_byte());
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("WAL record payload too large"))?;
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);
        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        let mut backend = self.backend.lock();
        let offset = backend.append(&data)?;

        if self.sync_on_write {
            backend.sync()?;
        }

        Ok(offset)
    }

    /// Hands pending writes to the OS.
    pub fn flush(&self) -> CoreResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }

    /// Returns the current WAL size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Returns a streaming iterator over WAL records from the start.
    pub fn iter(&self) -> CoreResult<WalReader<'_>> {
        WalReader::new(self.backend.lock(), 0)
    }

    /// Reads all records into memory.
    ///
    /// Recovery uses [`Self::iter`]; this is for small WALs and tests.
    pub fn read_all(&self) -> CoreResult<Vec<(u64, WalRecord)>> {
        self.iter()?.collect()
    }

    /// Truncates the WAL to the given offset.
    pub fn truncate(&self, offset: u64) -> CoreResult<()> {
        self.backend.lock().truncate(offset)?;
        Ok(())
    }

    /// Clears the WAL after a checkpoint.
    pub fn clear(&self) -> CoreResult<()> {
        self.truncate(0)
    }

    #[cfg(test)]
    pub(crate) fn backend_for_testing(&self) -> Arc<Mutex<Box<dyn StorageBackend>>> {
        Arc::clone(&self.backend)
    }
}

impl std::fmt::Debug for WalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalManager")
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}
