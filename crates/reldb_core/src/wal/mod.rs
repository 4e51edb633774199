//! Write-ahead log.
//!
//! Every commit is journaled here before the record log or index is
//! touched. On startup the log is replayed: transactions with a commit
//! marker are reapplied, anything without one is discarded. A cleanly
//! truncated tail (torn final write) is tolerated; a corrupt record in
//! the interior is not.

mod reader;
mod record;
mod writer;

pub use reader::WalReader;
pub use record::{compute_crc32, WalRecord, WalRecordType, WAL_MAGIC, WAL_VERSION};
pub use writer::WalManager;
