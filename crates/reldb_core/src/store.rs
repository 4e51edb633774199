//! Typed entity store.

use crate::config::StoreConfig;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::filter::{evaluate, Filter};
use crate::index::{decode_index_file, encode_index_file, RelationIndex};
use crate::log::RecordLog;
use crate::manifest::Manifest;
use crate::record::{decode_entity, encode_entity, Entity, RecordId};
use crate::relation::{RelationshipDelta, Relational, Relationships};
use crate::txn::TransactionManager;
use crate::wal::WalManager;
use parking_lot::{Mutex, RwLock};
use reldb_storage::{FileBackend, InMemoryBackend};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A single-process, file-backed store for one entity type.
///
/// Mutations are journaled through a write-ahead log and serialized by
/// a single-writer lock; reads run concurrently. The relationship
/// index is derived from entity declarations and kept consistent with
/// the record log inside every commit.
///
/// Once [`Store::close`] has run (directly or via `Drop`), every
/// operation fails with [`CoreError::Closed`].
pub struct Store<T> {
    dir: Mutex<Option<StoreDir>>,
    manifest: Manifest,
    log: Arc<RecordLog>,
    txn: TransactionManager,
    index: RwLock<RelationIndex>,
    sync_on_commit: bool,
    closed: AtomicBool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Store<T>
where
    T: Relational + Serialize + DeserializeOwned,
{
    /// Opens or creates a store with default configuration.
    ///
    /// `relations` fixes the set of relation names this store indexes.
    /// Reopening an existing store with a different set is an error.
    pub fn open(path: &Path, relations: &[&str]) -> CoreResult<Self> {
        Self::open_with_config(path, relations, StoreConfig::default())
    }

    /// Opens or creates a store with the given configuration.
    pub fn open_with_config(
        path: &Path,
        relations: &[&str],
        config: StoreConfig,
    ) -> CoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;

        if config.error_if_exists && !dir.is_new_store() {
            return Err(CoreError::invalid_operation(format!(
                "store already exists: {}",
                path.display()
            )));
        }

        let requested: Vec<String> = {
            let mut names: Vec<String> = relations.iter().map(|r| (*r).to_string()).collect();
            names.sort();
            names.dedup();
            names
        };

        let manifest = match dir.load_manifest()? {
            Some(existing) => {
                if existing.relations != requested {
                    return Err(CoreError::invalid_operation(format!(
                        "registered relations {:?} do not match store relations {:?}",
                        requested, existing.relations
                    )));
                }
                existing
            }
            None => {
                let manifest = Manifest::new(config.format_version, requested);
                dir.save_manifest(&manifest)?;
                manifest
            }
        };

        info!(path = %path.display(), relations = ?manifest.relations, "opening store");

        let wal_backend = FileBackend::open(&dir.wal_path())?;
        let log_backend = FileBackend::open(&dir.records_path())?;

        Self::build(
            Some(dir),
            manifest,
            Box::new(wal_backend),
            Box::new(log_backend),
            config.sync_on_commit,
        )
    }

    /// Opens an in-memory store, useful for tests and ephemeral data.
    pub fn open_in_memory(relations: &[&str]) -> CoreResult<Self> {
        let names: Vec<String> = relations.iter().map(|r| (*r).to_string()).collect();
        let manifest = Manifest::new((1, 0), names);
        Self::build(
            None,
            manifest,
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
            false,
        )
    }

    fn build(
        dir: Option<StoreDir>,
        manifest: Manifest,
        wal_backend: Box<dyn reldb_storage::StorageBackend>,
        log_backend: Box<dyn reldb_storage::StorageBackend>,
        sync_on_commit: bool,
    ) -> CoreResult<Self> {
        let wal = Arc::new(WalManager::new(wal_backend, sync_on_commit));
        let log = Arc::new(RecordLog::new(log_backend));
        let txn = TransactionManager::new(Arc::clone(&wal), Arc::clone(&log));

        txn.recover()?;

        let store = Self {
            dir: Mutex::new(dir),
            manifest,
            log,
            txn,
            index: RwLock::new(RelationIndex::new(Vec::<String>::new())),
            sync_on_commit,
            closed: AtomicBool::new(false),
            _marker: PhantomData,
        };

        let index = store.load_or_rebuild_index()?;
        *store.index.write() = index;

        Ok(store)
    }

    /// Loads persisted index snapshots, falling back to a full rebuild
    /// from the record log when any snapshot is missing, stale or
    /// corrupt.
    fn load_or_rebuild_index(&self) -> CoreResult<RelationIndex> {
        let committed = self.txn.committed_sequence();

        if let Some(dir) = &*self.dir.lock() {
            let mut index = RelationIndex::new(self.manifest.relations.clone());
            let mut usable = true;

            for relation in &self.manifest.relations {
                match dir.load_index_file(relation)? {
                    Some(data) => match decode_index_file(&data) {
                        Ok(file) if file.name == *relation && file.sequence == committed => {
                            index.set_buckets(relation, file.buckets)?;
                        }
                        Ok(_) => {
                            debug!(relation, "stale index snapshot, rebuilding");
                            usable = false;
                            break;
                        }
                        Err(e) => {
                            warn!(relation, error = %e, "corrupt index snapshot, rebuilding");
                            usable = false;
                            break;
                        }
                    },
                    None => {
                        usable = false;
                        break;
                    }
                }
            }

            if usable {
                return Ok(index);
            }
        }

        self.rebuild_index()
    }

    /// Rebuilds the index from the record log.
    fn rebuild_index(&self) -> CoreResult<RelationIndex> {
        let mut index = RelationIndex::new(self.manifest.relations.clone());

        for id in self.log.live_ids() {
            let Some(bytes) = self.log.get(id)? else {
                continue;
            };
            let entity: T = decode_entity(&bytes)?;
            index.insert_all(id, &entity.relationships())?;
        }

        debug!(records = self.log.len(), "rebuilt relationship index");
        Ok(index)
    }

    /// Inserts a new entity, stamping a fresh id and timestamps.
    ///
    /// Whatever the caller put in the entity's metadata is overwritten.
    /// Returns the stored entity with its assigned metadata.
    pub fn insert(&self, mut entity: T) -> CoreResult<T> {
        self.ensure_open()?;

        entity.meta_mut().stamp_created();
        let id = entity.id();

        let relationships = entity.relationships();
        self.index.read().validate(&relationships)?;

        let delta = Relationships::diff(&Relationships::new(), &relationships);
        let payload = encode_entity(&entity)?;

        let guard = self.txn.begin();
        let mut index = self.index.write();
        self.txn.commit_put(&guard, id, payload)?;
        index.apply(id, &delta)?;

        Ok(entity)
    }

    /// Fetches an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no live record has this id.
    pub fn get(&self, id: RecordId) -> CoreResult<T> {
        self.ensure_open()?;

        let bytes = self.log.get(id)?.ok_or_else(|| CoreError::not_found(id))?;
        decode_entity(&bytes)
    }

    /// Updates an entity through a mutator closure.
    ///
    /// The closure receives the current stored value; its result is
    /// committed atomically with the matching index changes. The id and
    /// creation timestamp survive whatever the closure does to the
    /// metadata, and the update timestamp is refreshed. If the closure
    /// returns an error nothing is written.
    pub fn update<F>(&self, id: RecordId, mutator: F) -> CoreResult<T>
    where
        F: FnOnce(&mut T) -> CoreResult<()>,
    {
        self.ensure_open()?;

        let guard = self.txn.begin();

        let bytes = self.log.get(id)?.ok_or_else(|| CoreError::not_found(id))?;
        let mut entity: T = decode_entity(&bytes)?;
        let old_relationships = entity.relationships();
        let created_at = entity.meta().created_at;

        mutator(&mut entity)?;

        // Engine-managed fields win over anything the mutator wrote.
        let meta = entity.meta_mut();
        meta.id = id;
        meta.created_at = created_at;
        meta.stamp_updated();

        let new_relationships = entity.relationships();
        self.index.read().validate(&new_relationships)?;
        let delta = Relationships::diff(&old_relationships, &new_relationships);

        let payload = encode_entity(&entity)?;

        let mut index = self.index.write();
        self.txn.commit_put(&guard, id, payload)?;
        index.apply(id, &delta)?;

        Ok(entity)
    }

    /// Deletes an entity, returning the deleted value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no live record has this id.
    pub fn delete(&self, id: RecordId) -> CoreResult<T> {
        self.ensure_open()?;

        let guard = self.txn.begin();

        let bytes = self.log.get(id)?.ok_or_else(|| CoreError::not_found(id))?;
        let entity: T = decode_entity(&bytes)?;

        let delta = Relationships::diff(&entity.relationships(), &Relationships::new());

        let mut index = self.index.write();
        self.txn.commit_delete(&guard, id)?;
        index.apply(id, &delta)?;

        Ok(entity)
    }

    /// Returns every entity matching all of the given filters.
    ///
    /// With no filters, returns every live entity in insertion order.
    /// With filters, ordering follows the first filter's index order.
    pub fn get_filtered(&self, filters: &[Filter]) -> CoreResult<Vec<T>> {
        self.ensure_open()?;

        let index = self.index.read();
        let ids = evaluate(filters, &index, &self.log.live_ids())?;

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(bytes) = self.log.get(id)? else {
                continue;
            };
            results.push(decode_entity(&bytes)?);
        }

        Ok(results)
    }

    /// Visits each matching entity in order, stopping early when the
    /// callback returns `Ok(false)`.
    ///
    /// Early stop is a clean termination, not an error; callback errors
    /// propagate unchanged.
    pub fn for_each<F>(&self, filters: &[Filter], mut callback: F) -> CoreResult<()>
    where
        F: FnMut(&T) -> CoreResult<bool>,
    {
        self.ensure_open()?;

        let ids = {
            let index = self.index.read();
            evaluate(filters, &index, &self.log.live_ids())?
        };

        for id in ids {
            // Skip records deleted since the id snapshot was taken.
            let Some(bytes) = self.log.get(id)? else {
                continue;
            };
            let entity: T = decode_entity(&bytes)?;
            if !callback(&entity)? {
                break;
            }
        }

        Ok(())
    }
}

impl<T> Store<T> {
    /// Returns the number of live records.
    pub fn len(&self) -> CoreResult<usize> {
        self.ensure_open()?;
        Ok(self.log.len())
    }

    /// Returns whether the store holds no live records.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Flushes the record log, truncates the WAL and persists index
    /// snapshots.
    pub fn checkpoint(&self) -> CoreResult<()> {
        self.ensure_open()?;
        self.flush_durable_state()
    }

    /// Returns whether the store is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Closes the store, flushing all state to disk and releasing the
    /// directory lock.
    ///
    /// Idempotent. After close every operation returns
    /// [`CoreError::Closed`].
    pub fn close(&self) -> CoreResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.flush_durable_state()?;

        if let Some(dir) = self.dir.lock().take() {
            info!(path = %dir.path().display(), "closed store");
        }

        Ok(())
    }

    fn close_inner(&self) -> CoreResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.flush_durable_state()?;
        self.dir.lock().take();
        Ok(())
    }

    fn flush_durable_state(&self) -> CoreResult<()> {
        self.txn.checkpoint()?;
        self.persist_index()?;

        if let Some(dir) = &*self.dir.lock() {
            let mut manifest = self.manifest.clone();
            manifest.last_checkpoint = Some(self.txn.committed_sequence());
            dir.save_manifest(&manifest)?;
        }

        Ok(())
    }

    fn persist_index(&self) -> CoreResult<()> {
        let dir_guard = self.dir.lock();
        let Some(dir) = &*dir_guard else {
            return Ok(());
        };

        let committed = self.txn.committed_sequence();
        let index = self.index.read();

        for relation in &self.manifest.relations {
            let Some(buckets) = index.buckets(relation) else {
                continue;
            };
            let data = encode_index_file(relation, committed, buckets)?;
            dir.save_index_file(relation, &data)?;
        }

        Ok(())
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::Closed);
        }
        Ok(())
    }
}

impl<T> Drop for Store<T> {
    fn drop(&mut self) {
        // Best effort; errors on drop have nowhere to go.
        let _ = self.close_inner();
    }
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("relations", &self.manifest.relations)
            .field("live_records", &self.log.len())
            .field("sync_on_commit", &self.sync_on_commit)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Metadata;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        meta: Metadata,
        author: String,
        tag: String,
        body: String,
    }

    impl Note {
        fn new(author: &str, tag: &str, body: &str) -> Self {
            Self {
                meta: Metadata::default(),
                author: author.to_string(),
                tag: tag.to_string(),
                body: body.to_string(),
            }
        }
    }

    impl Entity for Note {
        fn meta(&self) -> &Metadata {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut Metadata {
            &mut self.meta
        }
    }

    impl Relational for Note {
        fn relationships(&self) -> Relationships {
            let mut rels = Relationships::new();
            rels.append("authors", self.author.clone());
            rels.append("tags", self.tag.clone());
            rels
        }
    }

    const RELATIONS: &[&str] = &["authors", "tags"];

    fn open_store() -> Store<Note> {
        Store::open_in_memory(RELATIONS).unwrap()
    }

    #[test]
    fn insert_stamps_metadata() {
        let store = open_store();

        let note = store.insert(Note::new("alice", "work", "hello")).unwrap();

        assert!(!note.meta.id.is_nil());
        assert!(note.meta.created_at > 0);
        assert_eq!(note.meta.created_at, note.meta.updated_at);
    }

    #[test]
    fn insert_then_get() {
        let store = open_store();

        let note = store.insert(Note::new("alice", "work", "hello")).unwrap();
        let fetched = store.get(note.meta.id).unwrap();

        assert_eq!(fetched, note);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = open_store();
        let result = store.get(RecordId::new());
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn update_preserves_identity() {
        let store = open_store();
        let note = store.insert(Note::new("alice", "work", "v1")).unwrap();

        let updated = store
            .update(note.meta.id, |n| {
                n.body = "v2".to_string();
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.meta.id, note.meta.id);
        assert_eq!(updated.meta.created_at, note.meta.created_at);
        assert!(updated.meta.updated_at >= note.meta.updated_at);
        assert_eq!(updated.body, "v2");
        assert_eq!(store.get(note.meta.id).unwrap().body, "v2");
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = open_store();
        let result = store.update(RecordId::new(), |_| Ok(()));
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn update_mutator_error_aborts() {
        let store = open_store();
        let note = store.insert(Note::new("alice", "work", "v1")).unwrap();

        let result = store.update(note.meta.id, |n| {
            n.body = "v2".to_string();
            Err(CoreError::invalid_operation("nope"))
        });
        assert!(result.is_err());

        assert_eq!(store.get(note.meta.id).unwrap().body, "v1");
    }

    #[test]
    fn update_cannot_forge_metadata() {
        let store = open_store();
        let note = store.insert(Note::new("alice", "work", "v1")).unwrap();

        let updated = store
            .update(note.meta.id, |n| {
                n.meta.id = RecordId::new();
                n.meta.created_at = 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.meta.id, note.meta.id);
        assert_eq!(updated.meta.created_at, note.meta.created_at);
    }

    #[test]
    fn delete_returns_entity_and_removes() {
        let store = open_store();
        let note = store.insert(Note::new("alice", "work", "bye")).unwrap();

        let deleted = store.delete(note.meta.id).unwrap();
        assert_eq!(deleted.body, "bye");

        assert!(matches!(
            store.get(note.meta.id),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(note.meta.id),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn filtered_queries() {
        let store = open_store();
        let n1 = store.insert(Note::new("alice", "work", "1")).unwrap();
        let n2 = store.insert(Note::new("alice", "home", "2")).unwrap();
        let n3 = store.insert(Note::new("bob", "work", "3")).unwrap();

        let alice = store
            .get_filtered(&[Filter::match_with("authors", "alice")])
            .unwrap();
        assert_eq!(
            alice.iter().map(|n| n.meta.id).collect::<Vec<_>>(),
            vec![n1.meta.id, n2.meta.id]
        );

        let alice_work = store
            .get_filtered(&[
                Filter::match_with("authors", "alice"),
                Filter::match_with("tags", "work"),
            ])
            .unwrap();
        assert_eq!(alice_work.len(), 1);
        assert_eq!(alice_work[0].meta.id, n1.meta.id);

        let all = store.get_filtered(&[]).unwrap();
        assert_eq!(
            all.iter().map(|n| n.meta.id).collect::<Vec<_>>(),
            vec![n1.meta.id, n2.meta.id, n3.meta.id]
        );
    }

    #[test]
    fn update_moves_between_keys() {
        let store = open_store();
        let note = store.insert(Note::new("alice", "work", "x")).unwrap();
        store.insert(Note::new("bob", "work", "y")).unwrap();

        store
            .update(note.meta.id, |n| {
                n.author = "bob".to_string();
                Ok(())
            })
            .unwrap();

        let alice = store
            .get_filtered(&[Filter::match_with("authors", "alice")])
            .unwrap();
        assert!(alice.is_empty());

        let bob = store
            .get_filtered(&[Filter::match_with("authors", "bob")])
            .unwrap();
        assert_eq!(bob.len(), 2);
        // Moved record lands at the tail of the target key.
        assert_eq!(bob[1].meta.id, note.meta.id);
    }

    #[test]
    fn unregistered_relation_rejected_at_insert() {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Rogue {
            meta: Metadata,
        }

        impl Entity for Rogue {
            fn meta(&self) -> &Metadata {
                &self.meta
            }
            fn meta_mut(&mut self) -> &mut Metadata {
                &mut self.meta
            }
        }

        impl Relational for Rogue {
            fn relationships(&self) -> Relationships {
                let mut rels = Relationships::new();
                rels.append("ghosts", "g1");
                rels
            }
        }

        let store: Store<Rogue> = Store::open_in_memory(&["others"]).unwrap();
        let result = store.insert(Rogue {
            meta: Metadata::default(),
        });
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn for_each_visits_in_order() {
        let store = open_store();
        store.insert(Note::new("alice", "work", "1")).unwrap();
        store.insert(Note::new("alice", "work", "2")).unwrap();
        store.insert(Note::new("alice", "work", "3")).unwrap();

        let mut bodies = Vec::new();
        store
            .for_each(&[Filter::match_with("authors", "alice")], |n| {
                bodies.push(n.body.clone());
                Ok(true)
            })
            .unwrap();

        assert_eq!(bodies, vec!["1", "2", "3"]);
    }

    #[test]
    fn for_each_early_stop_is_clean() {
        let store = open_store();
        for i in 0..5 {
            store
                .insert(Note::new("alice", "work", &i.to_string()))
                .unwrap();
        }

        let mut seen = 0;
        store
            .for_each(&[], |_| {
                seen += 1;
                Ok(seen < 2)
            })
            .unwrap();

        assert_eq!(seen, 2);
    }

    #[test]
    fn for_each_skips_records_deleted_mid_iteration() {
        let store = open_store();
        let first = store.insert(Note::new("alice", "work", "1")).unwrap();
        let second = store.insert(Note::new("alice", "work", "2")).unwrap();
        store.insert(Note::new("alice", "work", "3")).unwrap();

        let mut bodies = Vec::new();
        store
            .for_each(&[], |n| {
                if n.meta.id == first.meta.id {
                    store.delete(second.meta.id).unwrap();
                }
                bodies.push(n.body.clone());
                Ok(true)
            })
            .unwrap();

        assert_eq!(bodies, vec!["1", "3"]);
    }

    #[test]
    fn for_each_propagates_callback_error() {
        let store = open_store();
        store.insert(Note::new("alice", "work", "1")).unwrap();

        let result = store.for_each(&[], |_| Err(CoreError::invalid_operation("boom")));
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
    }

    #[test]
    fn closed_store_rejects_operations() {
        let store = open_store();
        let note = store.insert(Note::new("alice", "work", "1")).unwrap();

        store.close().unwrap();
        store.close().unwrap(); // idempotent

        assert!(matches!(
            store.get(note.meta.id),
            Err(CoreError::Closed)
        ));
        assert!(matches!(
            store.insert(Note::new("bob", "x", "y")),
            Err(CoreError::Closed)
        ));
        assert!(matches!(
            store.update(note.meta.id, |_| Ok(())),
            Err(CoreError::Closed)
        ));
        assert!(matches!(store.delete(note.meta.id), Err(CoreError::Closed)));
        assert!(matches!(store.get_filtered(&[]), Err(CoreError::Closed)));
        assert!(matches!(store.len(), Err(CoreError::Closed)));
    }

    #[test]
    fn persistence_across_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");
        let id;

        {
            let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
            let note = store.insert(Note::new("alice", "work", "durable")).unwrap();
            id = note.meta.id;
            store.close().unwrap();
        }

        {
            let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
            let note = store.get(id).unwrap();
            assert_eq!(note.body, "durable");

            let alice = store
                .get_filtered(&[Filter::match_with("authors", "alice")])
                .unwrap();
            assert_eq!(alice.len(), 1);
        }
    }

    #[test]
    fn reopen_with_different_relations_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");

        {
            let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
            store.close().unwrap();
        }

        let result: CoreResult<Store<Note>> = Store::open(&path, &["authors"]);
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
    }

    #[test]
    fn corrupt_index_snapshot_triggers_rebuild() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");
        let id;

        {
            let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
            id = store
                .insert(Note::new("alice", "work", "x"))
                .unwrap()
                .meta
                .id;
            store.close().unwrap();
        }

        // Trash one snapshot file.
        std::fs::write(path.join("INDEX/authors.idx"), b"garbage").unwrap();

        {
            let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
            let alice = store
                .get_filtered(&[Filter::match_with("authors", "alice")])
                .unwrap();
            assert_eq!(alice.len(), 1);
            assert_eq!(alice[0].meta.id, id);
        }
    }

    #[test]
    fn drop_without_close_persists() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");
        let id;

        {
            let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
            id = store
                .insert(Note::new("alice", "work", "x"))
                .unwrap()
                .meta
                .id;
            // Dropped without an explicit close.
        }

        let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
        assert_eq!(store.get(id).unwrap().body, "x");
    }

    #[test]
    fn second_open_while_held_is_locked() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");

        let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
        let result: CoreResult<Store<Note>> = Store::open(&path, RELATIONS);
        assert!(matches!(result, Err(CoreError::Locked)));
        drop(store);

        let reopened: Store<Note> = Store::open(&path, RELATIONS).unwrap();
        assert!(reopened.is_empty().unwrap());
    }

    #[test]
    fn close_releases_directory_lock() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");

        let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
        let id = store
            .insert(Note::new("alice", "work", "x"))
            .unwrap()
            .meta
            .id;
        assert!(store.is_open());
        store.close().unwrap();
        assert!(!store.is_open());

        // The first handle is still in scope, but the lock is gone.
        let reopened: Store<Note> = Store::open(&path, RELATIONS).unwrap();
        assert_eq!(reopened.get(id).unwrap().body, "x");
    }

    #[test]
    fn checkpoint_then_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("notes");
        let id;

        {
            let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
            id = store
                .insert(Note::new("alice", "work", "ck"))
                .unwrap()
                .meta
                .id;
            store.checkpoint().unwrap();
            store.close().unwrap();
        }

        let store: Store<Note> = Store::open(&path, RELATIONS).unwrap();
        assert_eq!(store.get(id).unwrap().body, "ck");
    }
}
