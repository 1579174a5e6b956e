use std::collections::hash_map;
use std::slice;

use rand::Rng;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::model::Triple;
use crate::types::{PenumbraError, Position, Result, TermId};

/// Bunch size at which an array bunch is promoted to a hashed bunch.
pub const DEFAULT_PROMOTION_THRESHOLD: usize = 16;

/// Dense entry vector plus a hash of entry positions.
///
/// Hash order drives natural iteration; the dense vector backs the
/// decorrelated traversal and keeps removal O(1) via swap-remove.
#[derive(Clone, Debug, Default)]
struct HashedTriples {
    entries: Vec<Triple>,
    slots: FxHashMap<Triple, usize>,
}

impl HashedTriples {
    fn from_entries(entries: Vec<Triple>) -> Self {
        let slots = entries.iter().enumerate().map(|(i, t)| (*t, i)).collect();
        Self { entries, slots }
    }

    fn insert(&mut self, triple: Triple) -> bool {
        if self.slots.contains_key(&triple) {
            return false;
        }
        self.slots.insert(triple, self.entries.len());
        self.entries.push(triple);
        true
    }

    fn remove(&mut self, triple: &Triple) -> bool {
        let Some(idx) = self.slots.remove(triple) else {
            return false;
        };
        self.entries.swap_remove(idx);
        if let Some(moved) = self.entries.get(idx) {
            self.slots.insert(*moved, idx);
        }
        true
    }
}

#[derive(Clone, Debug)]
enum Repr {
    Array(Vec<Triple>),
    Hash(HashedTriples),
}

/// Set of triples sharing the same identifier at one position.
///
/// Small bunches are insertion-ordered arrays scanned linearly. Once the size
/// reaches the promotion threshold the array is replaced by a hashed
/// representation; bunches are not demoted when they shrink.
#[derive(Clone, Debug)]
pub struct TripleBunch {
    key: TermId,
    position: Position,
    threshold: usize,
    repr: Repr,
}

impl TripleBunch {
    /// Creates an empty array bunch for `key` at `position`.
    pub fn new(position: Position, key: TermId, threshold: usize) -> Self {
        Self {
            key,
            position,
            threshold,
            repr: Repr::Array(Vec::new()),
        }
    }

    /// Identifier shared by every triple in the bunch.
    pub fn key(&self) -> TermId {
        self.key
    }

    /// Position the key is taken from.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns true while the bunch is array-backed.
    pub fn is_array(&self) -> bool {
        matches!(self.repr, Repr::Array(_))
    }

    /// Number of triples in the bunch.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Array(v) => v.len(),
            Repr::Hash(h) => h.entries.len(),
        }
    }

    /// Returns true when the bunch holds no triples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `triple`, returning true if it was not already present.
    pub fn add(&mut self, triple: Triple) -> Result<bool> {
        if triple.get(self.position) != self.key {
            return Err(PenumbraError::InconsistentIndexState(
                "triple does not share the bunch key",
            ));
        }
        match &mut self.repr {
            Repr::Array(entries) => {
                if entries.contains(&triple) {
                    return Ok(false);
                }
                entries.push(triple);
                if entries.len() >= self.threshold {
                    self.promote();
                }
                Ok(true)
            }
            Repr::Hash(hashed) => Ok(hashed.insert(triple)),
        }
    }

    /// Removes `triple`, returning true if it was present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        match &mut self.repr {
            Repr::Array(entries) => match entries.iter().position(|t| t == triple) {
                Some(idx) => {
                    entries.remove(idx);
                    true
                }
                None => false,
            },
            Repr::Hash(hashed) => hashed.remove(triple),
        }
    }

    /// Returns true if `triple` is in the bunch.
    pub fn contains(&self, triple: &Triple) -> bool {
        match &self.repr {
            Repr::Array(entries) => entries.contains(triple),
            Repr::Hash(hashed) => hashed.slots.contains_key(triple),
        }
    }

    /// Iterates the bunch in its natural order.
    ///
    /// The order depends on the representation and carries no meaning.
    pub fn iter(&self) -> BunchIter<'_> {
        let inner = match &self.repr {
            Repr::Array(entries) => IterInner::Array(entries.iter()),
            Repr::Hash(hashed) => IterInner::Hash(hashed.slots.keys()),
        };
        BunchIter { inner }
    }

    /// Dense entry storage. Positions are stable until the bunch is modified.
    pub fn as_slice(&self) -> &[Triple] {
        match &self.repr {
            Repr::Array(entries) => entries,
            Repr::Hash(hashed) => &hashed.entries,
        }
    }

    /// Existential test in natural order; cheapest when matches are rare.
    pub fn any_match<F>(&self, mut pred: F) -> bool
    where
        F: FnMut(&Triple) -> bool,
    {
        match &self.repr {
            Repr::Array(entries) => entries.iter().any(pred),
            Repr::Hash(hashed) => hashed.slots.keys().any(|t| pred(t)),
        }
    }

    /// Same answer as [`Self::any_match`], but visits entries in a strided
    /// order from a random start. Use it when many matches are expected and
    /// the natural order may cluster the non-matches first.
    pub fn any_match_random_order<F>(&self, pred: F) -> bool
    where
        F: FnMut(&Triple) -> bool,
    {
        let entries = match &self.repr {
            Repr::Array(entries) => entries.as_slice(),
            Repr::Hash(hashed) => hashed.entries.as_slice(),
        };
        any_strided(entries, pred)
    }

    fn promote(&mut self) {
        if let Repr::Array(entries) = &mut self.repr {
            let entries = std::mem::take(entries);
            debug!(
                position = self.position.as_str(),
                key = self.key.0,
                len = entries.len(),
                "bunch.promote"
            );
            self.repr = Repr::Hash(HashedTriples::from_entries(entries));
        }
    }
}

/// Iterator over the triples of a [`TripleBunch`].
pub struct BunchIter<'a> {
    inner: IterInner<'a>,
}

enum IterInner<'a> {
    Array(slice::Iter<'a, Triple>),
    Hash(hash_map::Keys<'a, Triple, usize>),
}

impl Iterator for BunchIter<'_> {
    type Item = Triple;

    fn next(&mut self) -> Option<Triple> {
        match &mut self.inner {
            IterInner::Array(it) => it.next().copied(),
            IterInner::Hash(it) => it.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            IterInner::Array(it) => it.size_hint(),
            IterInner::Hash(it) => it.size_hint(),
        }
    }
}

fn any_strided<F>(entries: &[Triple], mut pred: F) -> bool
where
    F: FnMut(&Triple) -> bool,
{
    let len = entries.len();
    if len == 0 {
        return false;
    }
    let mut rng = rand::thread_rng();
    let start = rng.gen_range(0..len);
    let stride = coprime_stride(len, rng.gen_range(0..len));
    let mut idx = start;
    for _ in 0..len {
        if pred(&entries[idx]) {
            return true;
        }
        idx = (idx + stride) % len;
    }
    false
}

/// Smallest stride >= `seed` that is coprime with `len`, so the walk visits
/// every index exactly once.
fn coprime_stride(len: usize, seed: usize) -> usize {
    if len <= 2 {
        return 1;
    }
    let mut stride = seed.clamp(1, len - 1);
    while gcd(stride, len) != 1 {
        stride = if stride + 1 >= len { 1 } else { stride + 1 };
    }
    stride
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
