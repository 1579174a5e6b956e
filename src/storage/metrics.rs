use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::Position;

/// Trait for tracking graph store operations.
///
/// Implementations receive a callback for each successful mutation, each
/// bunch promotion and each index scan chosen by the pattern planner.
pub trait StoreMetrics: Send + Sync {
    /// Records a triple added to all three indexes.
    fn triple_added(&self);

    /// Records a triple removed from all three indexes.
    fn triple_deleted(&self);

    /// Records an array bunch converted to its hashed form.
    fn bunch_promoted(&self, position: Position);

    /// Records a pattern query served by the index at `position`.
    ///
    /// `None` means no position was bound and a full index was scanned.
    fn pattern_scan(&self, position: Option<Position>);
}

/// A no-op implementation of [`StoreMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl StoreMetrics for NoopMetrics {
    fn triple_added(&self) {}
    fn triple_deleted(&self) {}
    fn bunch_promoted(&self, _position: Position) {}
    fn pattern_scan(&self, _position: Option<Position>) {}
}

/// Atomic counter implementation of [`StoreMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Triples added.
    pub triples_added: AtomicU64,

    /// Triples deleted.
    pub triples_deleted: AtomicU64,

    /// Bunch promotions across all indexes.
    pub bunch_promotions: AtomicU64,

    /// Pattern queries answered through the subject index.
    pub subject_scans: AtomicU64,

    /// Pattern queries answered through the predicate index.
    pub predicate_scans: AtomicU64,

    /// Pattern queries answered through the object index.
    pub object_scans: AtomicU64,

    /// Pattern queries with no bound position.
    pub full_scans: AtomicU64,
}

impl StoreMetrics for CounterMetrics {
    fn triple_added(&self) {
        self.triples_added.fetch_add(1, Ordering::Relaxed);
    }

    fn triple_deleted(&self) {
        self.triples_deleted.fetch_add(1, Ordering::Relaxed);
    }

    fn bunch_promoted(&self, _position: Position) {
        self.bunch_promotions.fetch_add(1, Ordering::Relaxed);
    }

    fn pattern_scan(&self, position: Option<Position>) {
        let counter = match position {
            Some(Position::Subject) => &self.subject_scans,
            Some(Position::Predicate) => &self.predicate_scans,
            Some(Position::Object) => &self.object_scans,
            None => &self.full_scans,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation.
pub fn default_metrics() -> Arc<dyn StoreMetrics> {
    Arc::new(NoopMetrics)
}
