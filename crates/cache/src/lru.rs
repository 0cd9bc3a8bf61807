//! Least-recently-used access tracking.
//!
//! [`Lru`] does not store cache values itself; it tracks last-access times
//! for int64 identifiers (run IDs) so that the owner of an unbounded cache
//! can bound it by evicting the least-recently-accessed fraction.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Stamp {
    at: Instant,
    // Tie-break for accesses within one clock tick.
    seq: u64,
}

/// A least-recently-used collection supporting access and bulk eviction.
///
/// The first access of an unevicted value implicitly adds it to the
/// collection. All operations are internally synchronized; a single
/// coarse lock is plenty at the access rates involved.
#[derive(Debug, Default)]
pub struct Lru {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    by_id: FxHashMap<i64, Stamp>,
    next_seq: u64,
}

impl Lru {
    /// Construct a new empty collection.
    pub fn new() -> Self {
        Lru::default()
    }

    /// Record the current time as the last-accessed time for `id`,
    /// inserting it if it is not present.
    pub fn access(&self, id: i64) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.by_id.insert(
            id,
            Stamp {
                at: Instant::now(),
                seq,
            },
        );
    }

    /// Evict the oldest `percent` (clamped to `[0, 1]`) of the collection,
    /// returning the evicted ids, oldest first.
    ///
    /// A non-empty collection always evicts at least one entry:
    /// `max(1, floor(len * percent))`. An empty collection evicts nothing.
    pub fn evict_lru(&self, percent: f64) -> Vec<i64> {
        let mut state = self.state.lock();
        if state.by_id.is_empty() {
            return Vec::new();
        }
        let percent = percent.clamp(0.0, 1.0);
        let count = ((state.by_id.len() as f64 * percent).floor() as usize).max(1);

        let mut entries: Vec<(i64, Stamp)> =
            state.by_id.iter().map(|(id, stamp)| (*id, *stamp)).collect();
        entries.sort_by_key(|(_, stamp)| *stamp);

        let evicted: Vec<i64> = entries.iter().take(count).map(|(id, _)| *id).collect();
        for id in &evicted {
            state.by_id.remove(id);
        }
        evicted
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.state.lock().by_id.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.state.lock().by_id.is_empty()
    }
}
