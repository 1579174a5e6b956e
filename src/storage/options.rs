use std::sync::Arc;

use crate::storage::catalog::DictOptions;
use crate::storage::durable::DurableTermStore;
use crate::storage::index::DEFAULT_PROMOTION_THRESHOLD;
use crate::storage::metrics::StoreMetrics;

/// Configuration options supplied when opening a [`super::GraphStore`].
#[derive(Clone)]
pub struct StoreOptions {
    /// Durable backend the term dictionary allocates from.
    pub store: Arc<dyn DurableTermStore>,
    /// Cache capacities for the term dictionary.
    pub dict: DictOptions,
    /// Bunch size at which array bunches switch to hashed bunches.
    pub promotion_threshold: usize,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn StoreMetrics>>,
}

impl StoreOptions {
    /// Creates options with default cache sizes over `store`.
    pub fn new(store: Arc<dyn DurableTermStore>) -> Self {
        Self {
            store,
            dict: DictOptions::default(),
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            metrics: None,
        }
    }

    /// Sets the id → term cache capacity (0 disables it).
    pub fn id_to_term_cache(mut self, capacity: usize) -> Self {
        self.dict.id_to_term_cache = capacity;
        self
    }

    /// Sets the term → id cache capacity (0 disables it).
    pub fn term_to_id_cache(mut self, capacity: usize) -> Self {
        self.dict.term_to_id_cache = capacity;
        self
    }

    /// Sets the negative lookup cache capacity (0 disables it).
    pub fn miss_cache(mut self, capacity: usize) -> Self {
        self.dict.miss_cache = capacity;
        self
    }

    /// Replaces all dictionary cache capacities.
    pub fn dict_options(mut self, dict: DictOptions) -> Self {
        self.dict = dict;
        self
    }

    /// Sets the array → hash promotion threshold.
    pub fn promotion_threshold(mut self, threshold: usize) -> Self {
        self.promotion_threshold = threshold;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn StoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
