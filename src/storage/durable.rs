use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::types::{PenumbraError, Result, TermId};

/// Durable append/lookup of raw term encodings.
///
/// Implementations allocate identifiers monotonically starting at 1 and never
/// reuse them. The dictionary relies only on byte equality of the payloads.
pub trait DurableTermStore: Send + Sync {
    /// Stores `bytes` under a fresh identifier.
    fn allocate(&self, bytes: &[u8]) -> Result<TermId>;

    /// Reads the bytes stored under `id`, or [`PenumbraError::NotFound`].
    fn read(&self, id: TermId) -> Result<Vec<u8>>;

    /// Probes for `bytes` without allocating.
    fn find(&self, bytes: &[u8]) -> Result<Option<TermId>>;

    /// Number of allocated identifiers.
    fn len(&self) -> usize;

    /// Returns true when nothing has been allocated.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Operation counters for a [`MemTermStore`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DurableStats {
    /// Successful allocations.
    pub allocations: u64,
    /// Calls to [`DurableTermStore::read`].
    pub reads: u64,
    /// Calls to [`DurableTermStore::find`].
    pub finds: u64,
}

#[derive(Default)]
struct MemInner {
    by_id: Vec<Arc<[u8]>>,
    by_bytes: FxHashMap<Arc<[u8]>, TermId>,
}

/// In-process [`DurableTermStore`] used by tests and embedded callers.
///
/// An optional identifier ceiling makes allocation exhaustion observable.
#[derive(Default)]
pub struct MemTermStore {
    inner: RwLock<MemInner>,
    max_ids: Option<u64>,
    allocations: AtomicU64,
    reads: AtomicU64,
    finds: AtomicU64,
}

impl MemTermStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that refuses to allocate more than `max_ids` identifiers.
    pub fn with_max_ids(max_ids: u64) -> Self {
        Self {
            max_ids: Some(max_ids),
            ..Self::default()
        }
    }

    /// Returns the operation counters.
    pub fn stats(&self) -> DurableStats {
        DurableStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            finds: self.finds.load(Ordering::Relaxed),
        }
    }
}

impl DurableTermStore for MemTermStore {
    fn allocate(&self, bytes: &[u8]) -> Result<TermId> {
        let mut inner = self.inner.write();
        if let Some(&existing) = inner.by_bytes.get(bytes) {
            return Ok(existing);
        }
        let next = inner.by_id.len() as u64 + 1;
        if self.max_ids.is_some_and(|max| next > max) {
            warn!(next, "durable.allocate.exhausted");
            return Err(PenumbraError::AllocationExhausted);
        }
        let payload: Arc<[u8]> = Arc::from(bytes);
        let id = TermId(next);
        inner.by_id.push(Arc::clone(&payload));
        inner.by_bytes.insert(payload, id);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        trace!(id = id.0, len = bytes.len(), "durable.allocate");
        Ok(id)
    }

    fn read(&self, id: TermId) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let inner = self.inner.read();
        let idx = id
            .0
            .checked_sub(1)
            .and_then(|idx| usize::try_from(idx).ok())
            .ok_or(PenumbraError::NotFound)?;
        inner
            .by_id
            .get(idx)
            .map(|bytes| bytes.to_vec())
            .ok_or(PenumbraError::NotFound)
    }

    fn find(&self, bytes: &[u8]) -> Result<Option<TermId>> {
        self.finds.fetch_add(1, Ordering::Relaxed);
        Ok(self.inner.read().by_bytes.get(bytes).copied())
    }

    fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }
}
