//! Per-position triple indexes built from hybrid bunches.

mod bunch;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::model::Triple;
use crate::types::{Position, Result, TermId};

pub use bunch::{BunchIter, TripleBunch, DEFAULT_PROMOTION_THRESHOLD};

/// Outcome of [`TripleIndex::insert`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InsertOutcome {
    /// The triple was not present before.
    pub added: bool,
    /// The insert promoted the bunch to its hashed representation.
    pub promoted: bool,
}

/// Maps the identifier at one position to the bunch of triples sharing it.
#[derive(Clone, Debug)]
pub struct TripleIndex {
    position: Position,
    threshold: usize,
    bunches: FxHashMap<TermId, TripleBunch>,
    len: usize,
}

impl TripleIndex {
    /// Creates an empty index over `position`.
    pub fn new(position: Position, threshold: usize) -> Self {
        Self {
            position,
            threshold,
            bunches: FxHashMap::default(),
            len: 0,
        }
    }

    /// Position this index is keyed on.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of triples indexed.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when no triples are indexed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys (non-empty bunches).
    pub fn key_count(&self) -> usize {
        self.bunches.len()
    }

    /// Inserts `triple` into the bunch for its key, creating the bunch if needed.
    pub fn insert(&mut self, triple: Triple) -> Result<InsertOutcome> {
        let key = triple.get(self.position);
        let (position, threshold) = (self.position, self.threshold);
        let bunch = self
            .bunches
            .entry(key)
            .or_insert_with(|| TripleBunch::new(position, key, threshold));
        let was_array = bunch.is_array();
        let added = bunch.add(triple)?;
        let promoted = was_array && !bunch.is_array();
        if added {
            self.len += 1;
        }
        Ok(InsertOutcome { added, promoted })
    }

    /// Removes `triple`, dropping its bunch once empty.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let key = triple.get(self.position);
        let Some(bunch) = self.bunches.get_mut(&key) else {
            return false;
        };
        if !bunch.remove(triple) {
            return false;
        }
        self.len -= 1;
        if bunch.is_empty() {
            self.bunches.remove(&key);
            debug!(position = self.position.as_str(), key = key.0, "index.bunch.drop");
        }
        true
    }

    /// Returns true if `triple` is indexed.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.bunches
            .get(&triple.get(self.position))
            .is_some_and(|bunch| bunch.contains(triple))
    }

    /// Returns the bunch for `key`, if any triple uses it.
    pub fn find_bunch(&self, key: TermId) -> Option<&TripleBunch> {
        self.bunches.get(&key)
    }

    /// Iterates over the keys of all non-empty bunches, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = TermId> + '_ {
        self.bunches.keys().copied()
    }

    /// Iterates over all bunches.
    pub fn bunches(&self) -> impl Iterator<Item = &TripleBunch> + '_ {
        self.bunches.values()
    }

    /// Iterates over every indexed triple.
    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.bunches.values().flat_map(TripleBunch::iter)
    }
}
