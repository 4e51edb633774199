//! In-memory relationship index.

use crate::error::{CoreError, CoreResult};
use crate::record::RecordId;
use crate::relation::{RelationshipDelta, Relationships};
use std::collections::HashMap;

/// In-memory index over every registered relation.
///
/// Each relation maps foreign keys to the ids of its member records, in
/// first-insertion order per key. A record keeps its position under a
/// key across updates; moving to a different key appends at the new
/// key's tail.
///
/// Relation names are fixed at construction. Referencing an
/// unregistered relation is an error, which guarantees a rebuild never
/// encounters a relation it has no bucket for.
#[derive(Debug, Clone)]
pub struct RelationIndex {
    map: HashMap<String, HashMap<String, Vec<RecordId>>>,
}

impl RelationIndex {
    /// Creates an empty index with the given registered relations.
    pub fn new<I, S>(relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = relations
            .into_iter()
            .map(|name| (name.into(), HashMap::new()))
            .collect();
        Self { map }
    }

    /// Returns the registered relation names, sorted.
    pub fn relation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns whether a relation is registered.
    #[must_use]
    pub fn is_registered(&self, relation: &str) -> bool {
        self.map.contains_key(relation)
    }

    /// Validates that every relation a membership set references is
    /// registered.
    pub fn validate(&self, relationships: &Relationships) -> CoreResult<()> {
        for name in relationships.relation_names() {
            if !self.is_registered(name) {
                return Err(CoreError::invalid_operation(format!(
                    "unregistered relation: {name}"
                )));
            }
        }
        Ok(())
    }

    /// Applies an index delta for a record.
    ///
    /// Removals run before additions so a key move within one relation
    /// lands at the tail of the target key.
    pub fn apply(&mut self, record_id: RecordId, delta: &RelationshipDelta) -> CoreResult<()> {
        for (relation, key) in &delta.removed {
            let buckets = self.bucket_mut(relation)?;
            if let Some(ids) = buckets.get_mut(key) {
                ids.retain(|id| *id != record_id);
                if ids.is_empty() {
                    buckets.remove(key);
                }
            }
        }

        for (relation, key) in &delta.added {
            let ids = self.bucket_mut(relation)?.entry(key.clone()).or_default();
            if !ids.contains(&record_id) {
                ids.push(record_id);
            }
        }

        Ok(())
    }

    /// Adds every membership pair of a record, used during rebuild.
    pub fn insert_all(
        &mut self,
        record_id: RecordId,
        relationships: &Relationships,
    ) -> CoreResult<()> {
        let delta = RelationshipDelta {
            added: relationships
                .pairs()
                .map(|(r, k)| (r.to_string(), k.to_string()))
                .collect(),
            removed: Vec::new(),
        };
        self.apply(record_id, &delta)
    }

    /// Returns the ordered member ids for a `(relation, key)` pair.
    ///
    /// An unknown key yields an empty list; an unregistered relation is
    /// an error.
    pub fn lookup(&self, relation: &str, key: &str) -> CoreResult<Vec<RecordId>> {
        let buckets = self.map.get(relation).ok_or_else(|| {
            CoreError::invalid_operation(format!("unregistered relation: {relation}"))
        })?;
        Ok(buckets.get(key).cloned().unwrap_or_default())
    }

    /// Returns the keys currently populated under a relation, sorted.
    pub fn keys(&self, relation: &str) -> CoreResult<Vec<String>> {
        let buckets = self.map.get(relation).ok_or_else(|| {
            CoreError::invalid_operation(format!("unregistered relation: {relation}"))
        })?;
        let mut keys: Vec<String> = buckets.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Returns the key buckets for a relation, used for persistence.
    pub(crate) fn buckets(&self, relation: &str) -> Option<&HashMap<String, Vec<RecordId>>> {
        self.map.get(relation)
    }

    /// Replaces the key buckets for a relation, used when loading a
    /// persisted index file.
    pub(crate) fn set_buckets(
        &mut self,
        relation: &str,
        buckets: HashMap<String, Vec<RecordId>>,
    ) -> CoreResult<()> {
        let slot = self.bucket_mut(relation)?;
        *slot = buckets;
        Ok(())
    }

    fn bucket_mut(&mut self, relation: &str) -> CoreResult<&mut HashMap<String, Vec<RecordId>>> {
        self.map.get_mut(relation).ok_or_else(|| {
            CoreError::invalid_operation(format!("unregistered relation: {relation}"))
        })
    }
}
