//! Greeting entry entity.

use reldb_core::{CoreError, Entity, Metadata, Relational, Relationships};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for greeting operations.
pub type EntryResult<T> = Result<T, EntryError>;

/// Errors from the greetings controller.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The user ID field is empty.
    #[error("invalid user ID, cannot be empty")]
    EmptyUserId,

    /// The greeting field is empty.
    #[error("invalid greeting, cannot be empty")]
    EmptyGreeting,

    /// The favorite time of day field is empty.
    #[error("invalid favorite time of day, cannot be empty")]
    EmptyFavoriteTimeOfDay,

    /// An underlying store error.
    #[error(transparent)]
    Store(#[from] CoreError),
}

/// A stored greeting entry.
///
/// Each entry belongs to one user; the `users` relation lets the
/// controller list a user's entries in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Engine-managed metadata.
    pub meta: Metadata,

    /// User this entry is related to.
    pub user_id: String,

    /// The user's favorite greeting.
    pub greeting: String,

    /// The user's favorite time of day.
    pub favorite_time_of_day: String,
}

impl Entry {
    /// Creates a new unsaved entry.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        greeting: impl Into<String>,
        favorite_time_of_day: impl Into<String>,
    ) -> Self {
        Self {
            meta: Metadata::default(),
            user_id: user_id.into(),
            greeting: greeting.into(),
            favorite_time_of_day: favorite_time_of_day.into(),
        }
    }

    /// Ensures the entry is valid for storage.
    pub fn validate(&self) -> EntryResult<()> {
        if self.user_id.is_empty() {
            return Err(EntryError::EmptyUserId);
        }
        if self.greeting.is_empty() {
            return Err(EntryError::EmptyGreeting);
        }
        if self.favorite_time_of_day.is_empty() {
            return Err(EntryError::EmptyFavoriteTimeOfDay);
        }
        Ok(())
    }
}

impl Entity for Entry {
    fn meta(&self) -> &Metadata {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }
}

impl Relational for Entry {
    fn relationships(&self) -> Relationships {
        let mut rels = Relationships::new();
        // The user is our only relationship at the moment.
        rels.append(crate::controller::RELATION_USERS, self.user_id.clone());
        rels
    }
}
