//! # reldb storage
//!
//! Lowest-level storage abstraction for reldb. Backends are **opaque byte
//! stores** - they read, append, flush and truncate bytes without knowing
//! anything about record logs, WAL framing or index files. reldb owns all
//! file format interpretation.
//!
//! ## Available backends
//!
//! - [`InMemoryBackend`] - for tests and ephemeral stores
//! - [`FileBackend`] - persistent storage over OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use reldb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
