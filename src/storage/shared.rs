use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::model::{RdfTerm, Slot, TermTriple, Triple, TriplePattern};
use crate::storage::graph::{decode_triple, Access, GraphStore};
use crate::storage::index::TripleBunch;
use crate::storage::options::StoreOptions;
use crate::types::{PenumbraError, Position, Result, TermId};

/// Triples decoded per lock acquisition by a [`SharedCursor`].
pub const DEFAULT_CURSOR_BATCH: usize = 256;

/// Single-writer, multi-reader handle to a [`GraphStore`].
///
/// Reads share the lock; `add` and `delete` take it exclusively for the whole
/// store since a mutation touches all three indexes.
#[derive(Clone)]
pub struct SharedGraph {
    inner: Arc<RwLock<GraphStore>>,
}

impl SharedGraph {
    /// Wraps an existing store.
    pub fn new(store: GraphStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Opens an empty store with `opts`.
    pub fn open(opts: StoreOptions) -> Self {
        Self::new(GraphStore::open(opts))
    }

    /// Shared access for borrowed iteration; writers wait until it is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.inner.read()
    }

    /// Exclusive access.
    pub fn write(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.inner.write()
    }

    /// See [`GraphStore::add`].
    pub fn add(&self, s: &RdfTerm, p: &RdfTerm, o: &RdfTerm) -> Result<bool> {
        self.inner.write().add(s, p, o)
    }

    /// See [`GraphStore::delete`].
    pub fn delete(&self, s: &RdfTerm, p: &RdfTerm, o: &RdfTerm) -> Result<bool> {
        self.inner.write().delete(s, p, o)
    }

    /// See [`GraphStore::encode`].
    pub fn encode(&self, term: &RdfTerm) -> Result<TermId> {
        self.inner.write().encode(term)
    }

    /// Decodes `id` under the read lock.
    pub fn decode(&self, id: TermId) -> Result<RdfTerm> {
        self.inner.read().dictionary().decode(id)
    }

    /// Looks `term` up under the read lock without allocating.
    pub fn lookup(&self, term: &RdfTerm) -> Result<Option<TermId>> {
        self.inner.read().dictionary().lookup(term)
    }

    /// See [`GraphStore::contains`].
    pub fn contains(&self, s: &Slot, p: &Slot, o: &Slot) -> Result<bool> {
        self.inner.read().contains(s, p, o)
    }

    /// Number of stored triples.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true when no triples are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a detached cursor over the pattern.
    ///
    /// The cursor does not hold the lock between batches. If the store is
    /// modified after the cursor was opened, the next batch fails with
    /// [`PenumbraError::ConcurrentModification`]; open a new cursor to retry.
    pub fn cursor(&self, s: &Slot, p: &Slot, o: &Slot) -> Result<SharedCursor> {
        let guard = self.inner.read();
        let (pattern, resume) = match guard.resolve_pattern(s, p, o)? {
            None => (TriplePattern::default(), Resume::Done),
            Some(pattern) => {
                let access = guard.access(pattern);
                guard.record_access(access);
                let resume = match access {
                    Access::Probe(triple) => Resume::Probe(triple),
                    Access::Bunch(position, key) => Resume::keys(position, vec![key]),
                    Access::Full(position) => {
                        let mut keys: Vec<TermId> = guard.index(position).keys().collect();
                        keys.sort_unstable();
                        Resume::keys(position, keys)
                    }
                };
                (pattern, resume)
            }
        };
        Ok(SharedCursor {
            graph: Arc::clone(&self.inner),
            pattern,
            generation: guard.generation(),
            resume,
            batch: DEFAULT_CURSOR_BATCH,
            buffer: VecDeque::new(),
            failed: false,
        })
    }
}

/// Where the next batch of a [`SharedCursor`] starts.
///
/// Bunch keys are snapshotted at open time and entries are addressed by their
/// dense position, so resuming costs nothing beyond the batch itself. Both
/// stay valid only while the store generation is unchanged.
enum Resume {
    Done,
    Probe(Triple),
    Keys {
        position: Position,
        keys: Vec<TermId>,
        key_idx: usize,
        entry_idx: usize,
    },
}

impl Resume {
    fn keys(position: Position, keys: Vec<TermId>) -> Self {
        Resume::Keys {
            position,
            keys,
            key_idx: 0,
            entry_idx: 0,
        }
    }
}

/// Fail-fast cursor over a [`SharedGraph`].
pub struct SharedCursor {
    graph: Arc<RwLock<GraphStore>>,
    pattern: TriplePattern,
    generation: u64,
    resume: Resume,
    batch: usize,
    buffer: VecDeque<TermTriple>,
    failed: bool,
}

impl SharedCursor {
    /// Sets how many triples are decoded per lock acquisition.
    pub fn with_batch_size(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }

    fn is_done(&self) -> bool {
        matches!(self.resume, Resume::Done)
    }

    fn fill(&mut self) -> Result<()> {
        let guard = self.graph.read();
        if guard.generation() != self.generation {
            debug!(
                opened = self.generation,
                current = guard.generation(),
                "cursor.concurrent_modification"
            );
            return Err(PenumbraError::ConcurrentModification);
        }
        let done = match &mut self.resume {
            Resume::Done => true,
            Resume::Probe(triple) => {
                let triple = *triple;
                if guard.index(Position::Object).contains(&triple) {
                    self.buffer.push_back(decode_triple(guard.dictionary(), triple)?);
                }
                true
            }
            Resume::Keys {
                position,
                keys,
                key_idx,
                entry_idx,
            } => {
                let index = guard.index(*position);
                let mut taken = 0;
                while taken < self.batch && *key_idx < keys.len() {
                    let entries = index
                        .find_bunch(keys[*key_idx])
                        .map_or(&[][..], TripleBunch::as_slice);
                    while taken < self.batch && *entry_idx < entries.len() {
                        let triple = entries[*entry_idx];
                        *entry_idx += 1;
                        if self.pattern.matches(&triple) {
                            self.buffer.push_back(decode_triple(guard.dictionary(), triple)?);
                            taken += 1;
                        }
                    }
                    if *entry_idx >= entries.len() {
                        *key_idx += 1;
                        *entry_idx = 0;
                    }
                }
                *key_idx >= keys.len()
            }
        };
        if done {
            self.resume = Resume::Done;
        }
        Ok(())
    }
}

impl Iterator for SharedCursor {
    type Item = Result<TermTriple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.buffer.is_empty() && !self.is_done() {
            if let Err(err) = self.fill() {
                self.failed = true;
                self.buffer.clear();
                return Some(Err(err));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
