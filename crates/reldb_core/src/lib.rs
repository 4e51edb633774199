//! # reldb core
//!
//! Embedded, single-process entity store with relationship indexing.
//!
//! This crate provides:
//! - A write-ahead log for crash-safe commits
//! - An append-only record log holding entity payloads
//! - A relationship index derived from entity declarations
//! - Filtered queries and ordered iteration with early stop
//! - A typed [`Store`] facade over all of it
//!
//! ## Example
//!
//! ```rust,ignore
//! use reldb_core::{Entity, Filter, Metadata, Relational, Relationships, Store};
//!
//! let store: Store<Entry> = Store::open(path, &["users"])?;
//! let entry = store.insert(Entry::new("u1", "hello"))?;
//! let mine = store.get_filtered(&[Filter::match_with("users", "u1")])?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dir;
pub mod error;
pub mod filter;
pub mod index;
pub mod log;
pub mod manifest;
pub mod record;
pub mod relation;
pub mod store;
pub mod txn;
pub mod types;
pub mod wal;

pub use config::StoreConfig;
pub use error::{CoreError, CoreResult};
pub use filter::Filter;
pub use record::{Entity, Metadata, RecordId};
pub use relation::{Relational, RelationshipDelta, Relationships};
pub use store::Store;
pub use types::{SequenceNumber, TransactionId};
