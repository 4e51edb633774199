//! Engine-managed record metadata.

use crate::record::RecordId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time as Unix milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Engine-managed metadata embedded in every stored entity.
///
/// The identifier is assigned on insert and immutable thereafter.
/// `created_at` is set once; `updated_at` is refreshed by every update.
/// Callers construct entities with `Metadata::default()` and let the
/// engine fill these fields in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Unique record identifier.
    pub id: RecordId,
    /// Creation timestamp (Unix milliseconds).
    pub created_at: i64,
    /// Last-update timestamp (Unix milliseconds).
    pub updated_at: i64,
}

impl Metadata {
    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Stamps fresh metadata for a newly inserted record.
    pub(crate) fn stamp_created(&mut self) {
        let now = now_millis();
        self.id = RecordId::new();
        self.created_at = now;
        self.updated_at = now;
    }

    /// Refreshes the update timestamp, preserving id and creation time.
    pub(crate) fn stamp_updated(&mut self) {
        self.updated_at = now_millis();
    }
}

/// Capability for types whose metadata is managed by the store.
///
/// Entities embed a [`Metadata`] by composition and expose it through
/// this trait; the engine never requires a particular struct layout.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, Clone)]
/// struct Entry {
///     meta: Metadata,
///     user_id: String,
/// }
///
/// impl Entity for Entry {
///     fn meta(&self) -> &Metadata { &self.meta }
///     fn meta_mut(&mut self) -> &mut Metadata { &mut self.meta }
/// }
/// ```
pub trait Entity {
    /// Returns the record's engine-managed metadata.
    fn meta(&self) -> &Metadata;

    /// Returns mutable access to the record's metadata.
    fn meta_mut(&mut self) -> &mut Metadata;

    /// Returns the record identifier.
    fn id(&self) -> RecordId {
        self.meta().id
    }
}
