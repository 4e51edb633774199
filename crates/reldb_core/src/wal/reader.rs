//! Streaming WAL reader used during recovery.

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{compute_crc32, WalRecord, WalRecordType, WAL_MAGIC, WAL_VERSION};
use parking_lot::MutexGuard;
use reldb_storage::StorageBackend;

/// Envelope header size: magic (4) + version (2) + type (1) + length (4).
const HEADER_SIZE: usize = 11;

/// Trailing CRC size.
const CRC_SIZE: usize = 4;

/// Streaming iterator over WAL records.
///
/// Records are read one at a time from the backend, so recovery memory
/// stays bounded by the largest single record.
///
/// Error policy:
/// - An incomplete record at the tail (torn final write) ends iteration
///   cleanly; the caller truncates the tail away.
/// - Bad magic, an unknown type, an unsupported version or a CRC
///   mismatch before the tail is corruption and fails recovery.
pub struct WalReader<'a> {
    backend: MutexGuard<'a, Box<dyn StorageBackend>>,
    total_size: u64,
    offset: u64,
    finished: bool,
}

impl<'a> WalReader<'a> {
    /// Creates a reader starting at the given offset (usually 0).
    pub fn new(
        backend: MutexGuard<'a, Box<dyn StorageBackend>>,
        start_offset: u64,
    ) -> CoreResult<Self> {
        let total_size = backend.size()?;
        Ok(Self {
            backend,
            total_size,
            offset: start_offset,
            finished: false,
        })
    }

    /// Returns the offset of the first byte not yet consumed.
    ///
    /// After iteration ends this marks the end of the valid WAL prefix.
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.offset
    }

    fn read_next(&mut self) -> CoreResult<Option<(u64, WalRecord)>> {
        if self.finished {
            return Ok(None);
        }

        let record_start = self.offset;
        let remaining = (self.total_size - self.offset) as usize;

        if remaining < HEADER_SIZE {
            // Torn header at the tail.
            self.finished = true;
            return Ok(None);
        }

        let header = self.backend.read_at(self.offset, HEADER_SIZE)?;

        if header[0..4] != WAL_MAGIC {
            self.finished = true;
            return Err(CoreError::wal_corruption(format!(
                "invalid magic at offset {record_start}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version > WAL_VERSION {
            self.finished = true;
            return Err(CoreError::wal_corruption(format!(
                "unsupported version {version} at offset {record_start}"
            )));
        }

        let type_byte = header[6];
        let Some(record_type) = WalRecordType::from_byte(type_byte) else {
            self.finished = true;
            return Err(CoreError::wal_corruption(format!(
                "unknown record type {type_byte} at offset {record_start}"
            )));
        };

        let payload_len =
            u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
        let total_len = HEADER_SIZE + payload_len + CRC_SIZE;

        if remaining < total_len {
            // Torn payload at the tail.
            self.finished = true;
            return Ok(None);
        }

        let body = self
            .backend
            .read_at(self.offset + HEADER_SIZE as u64, payload_len + CRC_SIZE)?;
        let payload = &body[..payload_len];
        let stored_crc = u32::from_le_bytes([
            body[payload_len],
            body[payload_len + 1],
            body[payload_len + 2],
            body[payload_len + 3],
        ]);

        let mut checked = Vec::with_capacity(HEADER_SIZE + payload_len);
        checked.extend_from_slice(&header);
        checked.extend_from_slice(payload);
        let computed_crc = compute_crc32(&checked);

        if stored_crc != computed_crc {
            self.finished = true;
            return Err(CoreError::ChecksumMismatch {
                expected: stored_crc,
                actual: computed_crc,
            });
        }

        let record = WalRecord::decode_payload(record_type, payload)?;
        self.offset += total_len as u64;

        Ok(Some((record_start, record)))
    }
}

impl Iterator for WalReader<'_> {
    type Item = CoreResult<(u64, WalRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
