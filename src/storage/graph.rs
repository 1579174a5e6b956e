//! Triple store coordinating the term dictionary and the three indexes.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, error, trace};

use crate::model::{RdfTerm, Slot, TermTriple, Triple, TriplePattern};
use crate::storage::catalog::TermDictionary;
use crate::storage::index::{BunchIter, TripleIndex};
use crate::storage::metrics::{default_metrics, StoreMetrics};
use crate::storage::options::StoreOptions;
use crate::types::{PenumbraError, Position, Result, TermId};

/// Order in which bound positions are preferred when picking an index.
///
/// Objects tend to have the smallest bunches and predicates the largest.
const SELECTIVITY_ORDER: [Position; 3] = [Position::Object, Position::Subject, Position::Predicate];

/// Summary of index occupancy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GraphStats {
    /// Stored triples.
    pub triples: usize,
    /// Distinct subjects.
    pub subject_keys: usize,
    /// Distinct predicates.
    pub predicate_keys: usize,
    /// Distinct objects.
    pub object_keys: usize,
    /// Bunches still array-backed, across all indexes.
    pub array_bunches: usize,
    /// Bunches promoted to hashed form, across all indexes.
    pub hash_bunches: usize,
}

/// In-memory triple store over dictionary-encoded terms.
///
/// Every triple lives in the subject, predicate and object index at once.
/// Mutations go through an undo log so a failure part-way through leaves the
/// three indexes exactly as they were.
///
/// Iterators returned by [`GraphStore::find`] borrow the store, so the borrow
/// checker rules out mutation while they are alive. [`GraphStore::generation`]
/// lets detached readers detect mutation between reads.
pub struct GraphStore {
    dict: TermDictionary,
    subjects: TripleIndex,
    predicates: TripleIndex,
    objects: TripleIndex,
    metrics: Arc<dyn StoreMetrics>,
    generation: u64,
    read_only: bool,
}

impl GraphStore {
    /// Opens an empty store whose dictionary allocates from `opts.store`.
    pub fn open(opts: StoreOptions) -> Self {
        let threshold = opts.promotion_threshold;
        Self {
            dict: TermDictionary::open(opts.store, opts.dict),
            subjects: TripleIndex::new(Position::Subject, threshold),
            predicates: TripleIndex::new(Position::Predicate, threshold),
            objects: TripleIndex::new(Position::Object, threshold),
            metrics: opts.metrics.unwrap_or_else(default_metrics),
            generation: 0,
            read_only: false,
        }
    }

    /// The term dictionary, for identifier-level callers.
    pub fn dictionary(&self) -> &TermDictionary {
        &self.dict
    }

    /// Number of stored triples.
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Returns true when no triples are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural modification counter, bumped by every effective mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true once identifier exhaustion has frozen the store.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns the index keyed on `position`.
    pub fn index(&self, position: Position) -> &TripleIndex {
        match position {
            Position::Subject => &self.subjects,
            Position::Predicate => &self.predicates,
            Position::Object => &self.objects,
        }
    }

    fn index_mut(&mut self, position: Position) -> &mut TripleIndex {
        match position {
            Position::Subject => &mut self.subjects,
            Position::Predicate => &mut self.predicates,
            Position::Object => &mut self.objects,
        }
    }

    /// Counts triples, keys and bunch representations across the indexes.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            triples: self.len(),
            subject_keys: self.subjects.key_count(),
            predicate_keys: self.predicates.key_count(),
            object_keys: self.objects.key_count(),
            ..GraphStats::default()
        };
        for position in Position::ALL {
            for bunch in self.index(position).bunches() {
                if bunch.is_array() {
                    stats.array_bunches += 1;
                } else {
                    stats.hash_bunches += 1;
                }
            }
        }
        stats
    }

    /// Encodes `term`, freezing the store if identifiers run out.
    pub fn encode(&mut self, term: &RdfTerm) -> Result<TermId> {
        if self.read_only {
            return Err(PenumbraError::ReadOnly);
        }
        self.dict.encode(term).inspect_err(|err| {
            if matches!(err, PenumbraError::AllocationExhausted) {
                error!("store.read_only: term identifiers exhausted");
                self.read_only = true;
            }
        })
    }

    /// Adds the triple `(s, p, o)`, returning false if it was already stored.
    pub fn add(&mut self, s: &RdfTerm, p: &RdfTerm, o: &RdfTerm) -> Result<bool> {
        if self.read_only {
            return Err(PenumbraError::ReadOnly);
        }
        if [s, p, o].iter().any(|term| term.is_variable()) {
            return Err(PenumbraError::MalformedTerm(
                "variables cannot be stored in triples".into(),
            ));
        }
        let triple = Triple::new(self.encode(s)?, self.encode(p)?, self.encode(o)?);
        self.insert_triple(triple)
    }

    /// Removes the triple `(s, p, o)`; unknown terms make this a no-op.
    pub fn delete(&mut self, s: &RdfTerm, p: &RdfTerm, o: &RdfTerm) -> Result<bool> {
        if self.read_only {
            return Err(PenumbraError::ReadOnly);
        }
        let (Some(si), Some(pi), Some(oi)) = (
            self.dict.lookup(s)?,
            self.dict.lookup(p)?,
            self.dict.lookup(o)?,
        ) else {
            trace!("store.delete.unknown_term");
            return Ok(false);
        };
        self.remove_triple(Triple::new(si, pi, oi))
    }

    fn insert_triple(&mut self, triple: Triple) -> Result<bool> {
        let mut applied: SmallVec<[Position; 3]> = SmallVec::new();
        for position in Position::ALL {
            let outcome = match self.index_mut(position).insert(triple) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.undo_inserts(&triple, &applied);
                    return Err(err);
                }
            };
            if outcome.promoted {
                self.metrics.bunch_promoted(position);
            }
            if outcome.added {
                applied.push(position);
            }
        }
        match applied.len() {
            3 => {
                self.generation += 1;
                self.metrics.triple_added();
                trace!(
                    s = triple.subject.0,
                    p = triple.predicate.0,
                    o = triple.object.0,
                    "store.add"
                );
                Ok(true)
            }
            0 => Ok(false),
            _ => {
                self.undo_inserts(&triple, &applied);
                error!(?triple, ?applied, "store.add.inconsistent");
                Err(PenumbraError::InconsistentIndexState(
                    "triple present in only some indexes",
                ))
            }
        }
    }

    fn remove_triple(&mut self, triple: Triple) -> Result<bool> {
        let mut applied: SmallVec<[Position; 3]> = SmallVec::new();
        for position in Position::ALL {
            if self.index_mut(position).remove(&triple) {
                applied.push(position);
            }
        }
        match applied.len() {
            3 => {
                self.generation += 1;
                self.metrics.triple_deleted();
                trace!(
                    s = triple.subject.0,
                    p = triple.predicate.0,
                    o = triple.object.0,
                    "store.delete"
                );
                Ok(true)
            }
            0 => Ok(false),
            _ => {
                for &position in applied.iter().rev() {
                    if let Err(err) = self.index_mut(position).insert(triple) {
                        error!(
                            %err,
                            position = position.as_str(),
                            ?triple,
                            "store.delete.restore_failed"
                        );
                    }
                }
                self.generation += 1;
                error!(?triple, ?applied, "store.delete.inconsistent");
                Err(PenumbraError::InconsistentIndexState(
                    "triple missing from some indexes",
                ))
            }
        }
    }

    fn undo_inserts(&mut self, triple: &Triple, applied: &[Position]) {
        for &position in applied.iter().rev() {
            self.index_mut(position).remove(triple);
        }
        // Rollback can create and drop bunches, so open cursors must not resume.
        self.generation += 1;
        debug!(undone = applied.len(), "store.add.rollback");
    }

    /// Resolves a term-level pattern to identifiers without allocating.
    ///
    /// Returns `None` when a bound term is unknown, since such a pattern
    /// cannot match anything.
    pub fn resolve_pattern(&self, s: &Slot, p: &Slot, o: &Slot) -> Result<Option<TriplePattern>> {
        let mut ids = [None; 3];
        for (slot, id) in [s, p, o].into_iter().zip(ids.iter_mut()) {
            if let Some(term) = slot.term() {
                match self.dict.lookup(term)? {
                    Some(found) => *id = Some(found),
                    None => return Ok(None),
                }
            }
        }
        let [subject, predicate, object] = ids;
        Ok(Some(TriplePattern::new(subject, predicate, object)))
    }

    /// Finds triples matching the pattern, decoding them lazily.
    pub fn find(&self, s: &Slot, p: &Slot, o: &Slot) -> Result<Matches<'_>> {
        let ids = match self.resolve_pattern(s, p, o)? {
            Some(pattern) => self.find_ids(pattern),
            None => IdMatches::empty(),
        };
        Ok(Matches {
            ids,
            dict: &self.dict,
        })
    }

    /// Identifier-level form of [`Self::find`].
    pub fn find_ids(&self, pattern: TriplePattern) -> IdMatches<'_> {
        let access = self.access(pattern);
        self.record_access(access);
        match access {
            Access::Probe(triple) => {
                IdMatches::probe(self.objects.contains(&triple).then_some(triple))
            }
            Access::Bunch(position, key) => match self.index(position).find_bunch(key) {
                Some(bunch) => IdMatches::bunch(bunch.iter(), pattern),
                None => IdMatches::empty(),
            },
            Access::Full(position) => IdMatches::scan(Box::new(self.index(position).iter())),
        }
    }

    /// Picks the index access for `pattern`.
    pub(crate) fn access(&self, pattern: TriplePattern) -> Access {
        if let Some(triple) = pattern.as_triple() {
            return Access::Probe(triple);
        }
        if let Some((position, key)) = SELECTIVITY_ORDER
            .into_iter()
            .find_map(|p| pattern.get(p).map(|key| (p, key)))
        {
            return Access::Bunch(position, key);
        }
        let smallest = Position::ALL
            .into_iter()
            .min_by_key(|&p| self.index(p).key_count())
            .unwrap_or(Position::Subject);
        Access::Full(smallest)
    }

    pub(crate) fn record_access(&self, access: Access) {
        match access {
            Access::Probe(_) => {}
            Access::Bunch(position, _) => self.metrics.pattern_scan(Some(position)),
            Access::Full(_) => self.metrics.pattern_scan(None),
        }
    }

    /// Returns true if any stored triple matches the pattern.
    pub fn contains(&self, s: &Slot, p: &Slot, o: &Slot) -> Result<bool> {
        Ok(self
            .resolve_pattern(s, p, o)?
            .is_some_and(|pattern| self.contains_ids(pattern)))
    }

    /// Identifier-level form of [`Self::contains`].
    ///
    /// `(?, p, o)` patterns probe the object bunch in randomised order: most
    /// triples with a given object tend to share its predicate, so matches are
    /// dense but may be clustered behind non-matches in natural order.
    pub fn contains_ids(&self, pattern: TriplePattern) -> bool {
        match self.access(pattern) {
            Access::Probe(triple) => self.objects.contains(&triple),
            Access::Full(_) => !self.is_empty(),
            Access::Bunch(position, key) => {
                let Some(bunch) = self.index(position).find_bunch(key) else {
                    return false;
                };
                if position == Position::Object
                    && pattern.subject.is_none()
                    && pattern.predicate.is_some()
                {
                    bunch.any_match_random_order(|t| pattern.matches(t))
                } else {
                    bunch.any_match(|t| pattern.matches(t))
                }
            }
        }
    }
}

/// How a pattern reaches the indexes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Access {
    /// Every position bound: membership test on the object index.
    Probe(Triple),
    /// Walk the bunch for `key` in the index at `position`.
    Bunch(Position, TermId),
    /// Nothing bound: walk every bunch of the index at `position`.
    Full(Position),
}

/// Lazy identifier-level pattern matches.
pub struct IdMatches<'a> {
    inner: IdMatchesInner<'a>,
}

enum IdMatchesInner<'a> {
    Empty,
    Probe(Option<Triple>),
    Bunch {
        iter: BunchIter<'a>,
        pattern: TriplePattern,
    },
    Scan(Box<dyn Iterator<Item = Triple> + 'a>),
}

impl<'a> IdMatches<'a> {
    fn empty() -> Self {
        Self {
            inner: IdMatchesInner::Empty,
        }
    }

    fn probe(hit: Option<Triple>) -> Self {
        Self {
            inner: IdMatchesInner::Probe(hit),
        }
    }

    fn bunch(iter: BunchIter<'a>, pattern: TriplePattern) -> Self {
        Self {
            inner: IdMatchesInner::Bunch { iter, pattern },
        }
    }

    fn scan(iter: Box<dyn Iterator<Item = Triple> + 'a>) -> Self {
        Self {
            inner: IdMatchesInner::Scan(iter),
        }
    }
}

impl Iterator for IdMatches<'_> {
    type Item = Triple;

    fn next(&mut self) -> Option<Triple> {
        match &mut self.inner {
            IdMatchesInner::Empty => None,
            IdMatchesInner::Probe(hit) => hit.take(),
            IdMatchesInner::Bunch { iter, pattern } => iter.find(|t| pattern.matches(t)),
            IdMatchesInner::Scan(iter) => iter.next(),
        }
    }
}

/// Lazy term-level pattern matches, decoded at the boundary.
pub struct Matches<'a> {
    ids: IdMatches<'a>,
    dict: &'a TermDictionary,
}

impl Iterator for Matches<'_> {
    type Item = Result<TermTriple>;

    fn next(&mut self) -> Option<Self::Item> {
        let triple = self.ids.next()?;
        Some(decode_triple(self.dict, triple))
    }
}

pub(crate) fn decode_triple(dict: &TermDictionary, triple: Triple) -> Result<TermTriple> {
    let [s, p, o] = dict.decode_all([triple.subject, triple.predicate, triple.object])?;
    Ok(TermTriple::new(s, p, o))
}
