//! Transaction coordination.
//!
//! Every mutation runs as a single-writer transaction: journal to the
//! WAL, flush, then apply to the record log. Recovery replays committed
//! transactions the log never received and discards the rest.

mod manager;

pub use manager::{TransactionManager, WriteGuard};
