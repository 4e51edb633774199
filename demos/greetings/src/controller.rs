//! Greetings controller.

use crate::entry::{Entry, EntryResult};
use reldb_core::{Filter, RecordId, Store};
use std::path::Path;
use tracing::debug;

/// Relation under which entries are indexed by their user.
pub(crate) const RELATION_USERS: &str = "users";

/// Management layer for the retrieval and modification of entries.
///
/// Validation runs here, before anything reaches the store; the store
/// itself never inspects entry contents.
#[derive(Debug)]
pub struct Controller {
    store: Store<Entry>,
}

impl Controller {
    /// Opens or creates a controller backed by the given directory.
    pub fn open(path: &Path) -> EntryResult<Self> {
        let store = Store::open(path, &[RELATION_USERS])?;
        Ok(Self { store })
    }

    /// Opens an in-memory controller, useful for tests.
    pub fn open_in_memory() -> EntryResult<Self> {
        let store = Store::open_in_memory(&[RELATION_USERS])?;
        Ok(Self { store })
    }

    /// Validates and stores a new entry, returning it with its
    /// assigned id and timestamps.
    pub fn create(&self, entry: Entry) -> EntryResult<Entry> {
        entry.validate()?;
        let stored = self.store.insert(entry)?;
        debug!(id = %stored.meta.id, user = %stored.user_id, "created entry");
        Ok(stored)
    }

    /// Fetches an entry by id.
    pub fn get(&self, id: RecordId) -> EntryResult<Entry> {
        Ok(self.store.get(id)?)
    }

    /// Returns all entries for a user, oldest first.
    pub fn entries_for_user(&self, user_id: &str) -> EntryResult<Vec<Entry>> {
        Ok(self
            .store
            .get_filtered(&[Filter::match_with(RELATION_USERS, user_id)])?)
    }

    /// Returns every entry, oldest first.
    pub fn all_entries(&self) -> EntryResult<Vec<Entry>> {
        Ok(self.store.get_filtered(&[])?)
    }

    /// Updates an entry through a mutator, validating the result before
    /// it is committed.
    pub fn update<F>(&self, id: RecordId, mutator: F) -> EntryResult<Entry>
    where
        F: FnOnce(&mut Entry),
    {
        let mut validation: Option<crate::EntryError> = None;
        let result = self.store.update(id, |entry| {
            mutator(entry);
            entry.validate().map_err(|e| {
                let message = e.to_string();
                validation = Some(e);
                reldb_core::CoreError::invalid_operation(message)
            })
        });

        match result {
            Ok(entry) => Ok(entry),
            Err(e) => Err(validation.unwrap_or(crate::EntryError::Store(e))),
        }
    }

    /// Deletes an entry, returning the deleted value.
    pub fn delete(&self, id: RecordId) -> EntryResult<Entry> {
        let removed = self.store.delete(id)?;
        debug!(id = %removed.meta.id, user = %removed.user_id, "deleted entry");
        Ok(removed)
    }

    /// Visits a user's entries in order, stopping when the callback
    /// returns `Ok(false)`.
    pub fn for_each_user_entry<F>(&self, user_id: &str, mut callback: F) -> EntryResult<()>
    where
        F: FnMut(&Entry) -> EntryResult<bool>,
    {
        let mut deferred: Option<crate::EntryError> = None;
        self.store
            .for_each(&[Filter::match_with(RELATION_USERS, user_id)], |entry| {
                match callback(entry) {
                    Ok(keep_going) => Ok(keep_going),
                    Err(e) => {
                        deferred = Some(e);
                        Ok(false)
                    }
                }
            })?;

        match deferred {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> EntryResult<usize> {
        Ok(self.store.len()?)
    }

    /// Returns whether the controller holds no entries.
    pub fn is_empty(&self) -> EntryResult<bool> {
        Ok(self.store.is_empty()?)
    }

    /// Closes the backing store.
    pub fn close(&self) -> EntryResult<()> {
        Ok(self.store.close()?)
    }
}
