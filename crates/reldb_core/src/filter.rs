//! Filter evaluation over the relationship index.
//!
//! A filter selects records by `(relation, key)` membership. Multiple
//! filters combine by intersection. The first filter's index ordering
//! is preserved, so pagination against a stable first filter stays
//! stable.

use crate::error::CoreResult;
use crate::index::RelationIndex;
use crate::record::RecordId;
use std::collections::HashSet;

/// A predicate over relationship index membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches records that are members of `key` under `relation`.
    Match {
        /// Relation name.
        relation: String,
        /// Foreign key within the relation.
        key: String,
    },
}

impl Filter {
    /// Creates a membership filter.
    #[must_use]
    pub fn match_with(relation: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Match {
            relation: relation.into(),
            key: key.into(),
        }
    }

    /// Returns the ordered candidate ids this filter selects.
    fn candidates(&self, index: &RelationIndex) -> CoreResult<Vec<RecordId>> {
        match self {
            Self::Match { relation, key } => index.lookup(relation, key),
        }
    }
}

/// Evaluates a filter set against the index.
///
/// With no filters every id in `all_ids` passes, in the given order.
/// Otherwise the result is the intersection of all filters' members,
/// ordered by the first filter's index ordering. An unpopulated key
/// yields an empty result, not an error.
pub fn evaluate(
    filters: &[Filter],
    index: &RelationIndex,
    all_ids: &[RecordId],
) -> CoreResult<Vec<RecordId>> {
    let Some((first, rest)) = filters.split_first() else {
        return Ok(all_ids.to_vec());
    };

    let mut result = first.candidates(index)?;

    for filter in rest {
        if result.is_empty() {
            break;
        }
        let members: HashSet<RecordId> = filter.candidates(index)?.into_iter().collect();
        result.retain(|id| members.contains(id));
    }

    Ok(result)
}
