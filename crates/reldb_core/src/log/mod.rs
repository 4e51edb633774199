//! Append-only record log.
//!
//! The log is the durable home of record payloads. Each version of a
//! record is appended as a framed entry; deletes append a tombstone.
//! An in-memory map from record id to the latest entry offset, plus an
//! insertion-order list of live ids, is rebuilt by scanning the log.

mod record;
mod store;

pub use record::{LogRecord, LogRecordFlags};
pub use store::RecordLog;
