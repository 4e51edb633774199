//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level storage backend for reldb.
///
/// Backends provide simple operations for reading, appending and
/// truncating bytes. The engine owns all file format interpretation;
/// backends never see record or WAL framing. Backends carry no interior
/// locking — the engine serializes access through its own locks, so
/// mutating operations take `&mut self`.
///
/// # Invariants
///
/// - `append` returns the offset where the data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `flush` hands buffered bytes to the OS: appended data survives a
///   process crash afterwards, but not necessarily power loss
/// - `sync` makes data and metadata durable against power loss
/// - backends must be `Send + Sync` so the engine can share them behind
///   its locks
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`](crate::StorageError::ReadPastEnd)
    /// if the read would extend beyond the current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Hands all buffered writes to the OS.
    ///
    /// After `flush`, appended data survives a crash of this process.
    /// Durability against power loss requires [`StorageBackend::sync`].
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// This is the offset where the next `append` will write.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// A stronger guarantee than `flush`: data and file metadata (size)
    /// survive power loss.
    fn sync(&mut self) -> StorageResult<()>;

    /// Truncates the storage to the given size.
    ///
    /// Removes all data at and after the specified offset. Used for WAL
    /// truncation after checkpoint and for discarding torn tails.
    ///
    /// # Errors
    ///
    /// Returns
    /// [`StorageError::TruncateBeyondEnd`](crate::StorageError::TruncateBeyondEnd)
    /// if `new_size` is greater than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
