//! Greetings demo.
//!
//! A small controller over a [`reldb_core::Store`] that keeps one
//! greeting entry per user interaction and relates entries to the user
//! that owns them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod controller;
mod entry;

pub use controller::Controller;
pub use entry::{Entry, EntryError, EntryResult};
