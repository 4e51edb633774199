//! Relationship declarations.
//!
//! Entities declare which foreign keys they relate to through the
//! [`Relational`] trait. The store derives its relationship index from
//! these declarations, so the declarations (not the index) are the
//! source of truth.

use crate::record::Entity;

/// Ordered set of relationship memberships declared by an entity.
///
/// Each entry pairs a relation name with the foreign keys the entity
/// belongs to under that relation. Relation names must match the names
/// registered with the store at open time. Empty keys are skipped when
/// appended, so callers can pass optional fields through unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    entries: Vec<(String, Vec<String>)>,
}

impl Relationships {
    /// Creates an empty relationship set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single key under the named relation.
    ///
    /// Empty keys are silently skipped.
    pub fn append(&mut self, relation: impl Into<String>, key: impl Into<String>) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.append_entry(relation.into(), vec![key]);
    }

    /// Appends multiple keys under the named relation.
    ///
    /// Empty keys are silently skipped.
    pub fn append_multi<I, K>(&mut self, relation: impl Into<String>, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            return;
        }
        self.append_entry(relation.into(), keys);
    }

    fn append_entry(&mut self, relation: String, mut keys: Vec<String>) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(name, _)| *name == relation) {
            for key in keys.drain(..) {
                if !existing.contains(&key) {
                    existing.push(key);
                }
            }
        } else {
            keys.dedup();
            self.entries.push((relation, keys));
        }
    }

    /// Returns true if no relationship memberships are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(relation, key)` pairs in declaration order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(relation, keys)| {
            keys.iter().map(move |key| (relation.as_str(), key.as_str()))
        })
    }

    /// Returns the relation names referenced by this set.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Computes the delta between a record's old and new memberships.
    ///
    /// Pairs present in `new` but not `old` are additions; pairs present
    /// in `old` but not `new` are removals. Unchanged pairs produce no
    /// delta, so an update that does not move a record between keys
    /// leaves its index position untouched.
    #[must_use]
    pub fn diff(old: &Self, new: &Self) -> RelationshipDelta {
        let old_pairs: Vec<(&str, &str)> = old.pairs().collect();
        let new_pairs: Vec<(&str, &str)> = new.pairs().collect();

        let added = new_pairs
            .iter()
            .filter(|pair| !old_pairs.contains(pair))
            .map(|(r, k)| ((*r).to_string(), (*k).to_string()))
            .collect();

        let removed = old_pairs
            .iter()
            .filter(|pair| !new_pairs.contains(pair))
            .map(|(r, k)| ((*r).to_string(), (*k).to_string()))
            .collect();

        RelationshipDelta { added, removed }
    }
}

/// Index changes produced by comparing relationship memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipDelta {
    /// `(relation, key)` pairs the record joined.
    pub added: Vec<(String, String)>,
    /// `(relation, key)` pairs the record left.
    pub removed: Vec<(String, String)>,
}

impl RelationshipDelta {
    /// Returns true if the delta carries no index changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Capability for entities that participate in relationship indexing.
///
/// Implementors return their current memberships from entity state;
/// the store re-derives them on every insert, update and delete, so the
/// index always reflects the stored value.
pub trait Relational: Entity {
    /// Returns the relationship memberships for the current entity state.
    fn relationships(&self) -> Relationships;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_skips_empty_keys() {
        let mut rels = Relationships::new();
        rels.append("users", "");
        assert!(rels.is_empty());

        rels.append("users", "u1");
        assert_eq!(rels.pairs().count(), 1);
    }

    #[test]
    fn append_multi_filters_and_dedupes() {
        let mut rels = Relationships::new();
        rels.append_multi("tags", ["a", "", "b"]);
        rels.append("tags", "a");

        let pairs: Vec<_> = rels.pairs().collect();
        assert_eq!(pairs, vec![("tags", "a"), ("tags", "b")]);
    }

    #[test]
    fn pairs_preserve_declaration_order() {
        let mut rels = Relationships::new();
        rels.append("users", "u1");
        rels.append("tags", "t1");
        rels.append("users", "u2");

        let pairs: Vec<_> = rels.pairs().collect();
        assert_eq!(
            pairs,
            vec![("users", "u1"), ("users", "u2"), ("tags", "t1")]
        );
    }

    #[test]
    fn diff_detects_moves() {
        let mut old = Relationships::new();
        old.append("users", "u1");
        old.append("tags", "t1");

        let mut new = Relationships::new();
        new.append("users", "u2");
        new.append("tags", "t1");

        let delta = Relationships::diff(&old, &new);
        assert_eq!(delta.added, vec![("users".to_string(), "u2".to_string())]);
        assert_eq!(delta.removed, vec![("users".to_string(), "u1".to_string())]);
    }

    #[test]
    fn diff_unchanged_is_empty() {
        let mut rels = Relationships::new();
        rels.append("users", "u1");

        let delta = Relationships::diff(&rels, &rels.clone());
        assert!(delta.is_empty());
    }
}
