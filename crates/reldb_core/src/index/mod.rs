//! Relationship index.
//!
//! Maps `(relation, key)` pairs to ordered sets of record ids. The
//! index is derived entirely from entity relationship declarations, so
//! it can always be rebuilt from the record log. Persisted index files
//! are an optimization, not source of truth.

mod persistence;
mod relation_index;

pub use persistence::{decode_index_file, encode_index_file, IndexFile};
pub use relation_index::RelationIndex;
