//! Optional-set algebra over run ids.
//!
//! The query engine narrows candidate runs by intersecting key sets
//! produced by independent sub-scans (revisions, browser versions). The
//! "no constraint yet" state must pass other sets through unchanged, so
//! the algebra lives in an explicit type rather than ad hoc `Option`
//! handling at every call site.

use rustc_hash::FxHashSet;

/// A set of run ids that may be unconstrained.
///
/// `Unconstrained` is the identity of [`IdFilter::merge`]: merging it with
/// any filter yields that filter unchanged. Two constrained filters merge
/// by intersection — a further constraint can only narrow the candidates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdFilter {
    /// No constraint: every id passes.
    #[default]
    Unconstrained,
    /// Only the contained ids pass.
    Ids(FxHashSet<i64>),
}

impl IdFilter {
    /// A constrained filter over the given ids.
    pub fn of(ids: impl IntoIterator<Item = i64>) -> Self {
        IdFilter::Ids(ids.into_iter().collect())
    }

    /// Whether this filter constrains anything.
    pub fn is_constrained(&self) -> bool {
        matches!(self, IdFilter::Ids(_))
    }

    /// Intersect-or-pass-through.
    pub fn merge(self, other: IdFilter) -> IdFilter {
        match (self, other) {
            (IdFilter::Unconstrained, other) => other,
            (this, IdFilter::Unconstrained) => this,
            (IdFilter::Ids(a), IdFilter::Ids(b)) => {
                IdFilter::Ids(a.intersection(&b).copied().collect())
            }
        }
    }

    /// Whether `id` passes the filter.
    pub fn contains(&self, id: i64) -> bool {
        match self {
            IdFilter::Unconstrained => true,
            IdFilter::Ids(ids) => ids.contains(&id),
        }
    }

    /// The constrained ids, or `None` when unconstrained.
    pub fn ids(&self) -> Option<&FxHashSet<i64>> {
        match self {
            IdFilter::Unconstrained => None,
            IdFilter::Ids(ids) => Some(ids),
        }
    }

    /// Number of ids a constrained filter passes; unconstrained has no count.
    pub fn len(&self) -> Option<usize> {
        self.ids().map(FxHashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unconstrained_is_identity() {
        let ids = IdFilter::of([1, 2, 3]);
        assert_eq!(IdFilter::Unconstrained.merge(ids.clone()), ids);
        assert_eq!(ids.clone().merge(IdFilter::Unconstrained), ids);
        assert_eq!(
            IdFilter::Unconstrained.merge(IdFilter::Unconstrained),
            IdFilter::Unconstrained
        );
    }

    #[test]
    fn constrained_filters_intersect() {
        let merged = IdFilter::of([1, 2, 3]).merge(IdFilter::of([2, 3, 4]));
        assert_eq!(merged, IdFilter::of([2, 3]));
    }

    #[test]
    fn empty_intersection_blocks_everything() {
        let merged = IdFilter::of([1]).merge(IdFilter::of([2]));
        assert!(merged.is_constrained());
        assert_eq!(merged.len(), Some(0));
        assert!(!merged.contains(1));
        assert!(!merged.contains(2));
    }

    #[test]
    fn contains_semantics() {
        assert!(IdFilter::Unconstrained.contains(7));
        let ids = IdFilter::of([7]);
        assert!(ids.contains(7));
        assert!(!ids.contains(8));
    }

    proptest! {
        #[test]
        fn merge_never_widens(a in proptest::collection::hash_set(0i64..50, 0..20),
                              b in proptest::collection::hash_set(0i64..50, 0..20)) {
            let merged = IdFilter::of(a.iter().copied()).merge(IdFilter::of(b.iter().copied()));
            for id in 0..50 {
                let expect = a.contains(&id) && b.contains(&id);
                prop_assert_eq!(merged.contains(id), expect);
            }
        }

        #[test]
        fn merge_is_commutative(a in proptest::collection::hash_set(0i64..50, 0..20),
                                b in proptest::collection::hash_set(0i64..50, 0..20)) {
            let ab = IdFilter::of(a.iter().copied()).merge(IdFilter::of(b.iter().copied()));
            let ba = IdFilter::of(b.iter().copied()).merge(IdFilter::of(a.iter().copied()));
            prop_assert_eq!(ab, ba);
        }
    }
}
