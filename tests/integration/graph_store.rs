#![allow(clippy::all)]

use std::collections::HashSet;
use std::sync::{Arc, Once};

use penumbra::{
    storage::{CounterMetrics, DurableTermStore, GraphStore, MemTermStore, StoreOptions},
    PenumbraError, Position, RdfTerm, Result, Slot, TermTriple, Triple, TriplePattern,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("penumbra=warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

fn open_store(threshold: usize) -> GraphStore {
    init_tracing();
    let store: Arc<dyn DurableTermStore> = Arc::new(MemTermStore::new());
    GraphStore::open(
        StoreOptions::new(store)
            .id_to_term_cache(10)
            .term_to_id_cache(10)
            .miss_cache(10)
            .promotion_threshold(threshold),
    )
}

fn iri(s: &str) -> RdfTerm {
    RdfTerm::iri(format!("http://example.org/{s}"))
}

fn slot(s: &str) -> Slot {
    Slot::Bound(iri(s))
}

fn collect(store: &GraphStore, s: Slot, p: Slot, o: Slot) -> Result<HashSet<TermTriple>> {
    store.find(&s, &p, &o)?.collect()
}

#[test]
fn basic_scenario() -> Result<()> {
    let mut store = open_store(16);
    assert!(store.add(&iri("a"), &iri("p"), &iri("b"))?);
    assert!(store.add(&iri("a"), &iri("p"), &iri("c"))?);
    assert!(store.add(&iri("d"), &iri("q"), &iri("b"))?);

    let by_subject = collect(&store, slot("a"), Slot::Any, Slot::Any)?;
    assert_eq!(by_subject.len(), 2);
    let by_object = collect(&store, Slot::Any, Slot::Any, slot("b"))?;
    assert_eq!(
        by_object,
        HashSet::from([
            TermTriple::new(iri("a"), iri("p"), iri("b")),
            TermTriple::new(iri("d"), iri("q"), iri("b")),
        ])
    );

    assert!(store.delete(&iri("a"), &iri("p"), &iri("b"))?);
    assert!(!store.contains(&slot("a"), &slot("p"), &slot("b"))?);
    assert_eq!(collect(&store, Slot::Any, Slot::Any, slot("b"))?.len(), 1);
    assert_eq!(store.len(), 2);
    Ok(())
}

#[test]
fn indexes_agree_after_random_workload() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    // A low threshold forces promotions mid-workload.
    let mut store = open_store(4);
    let mut model: HashSet<(u32, u32, u32)> = HashSet::new();

    for _ in 0..2_000 {
        let s = rng.gen_range(0..12u32);
        let p = rng.gen_range(0..4u32);
        let o = rng.gen_range(0..12u32);
        let (ts, tp, to) = (iri(&format!("s{s}")), iri(&format!("p{p}")), iri(&format!("o{o}")));
        if rng.gen_bool(0.65) {
            assert_eq!(store.add(&ts, &tp, &to)?, model.insert((s, p, o)));
        } else {
            assert_eq!(store.delete(&ts, &tp, &to)?, model.remove(&(s, p, o)));
        }
    }

    assert_eq!(store.len(), model.len());
    for position in Position::ALL {
        let index = store.index(position);
        assert_eq!(index.len(), model.len(), "{position} index size");
        let from_index: HashSet<Triple> = index.iter().collect();
        let from_subjects: HashSet<Triple> = store.index(Position::Subject).iter().collect();
        assert_eq!(from_index, from_subjects, "{position} index contents");
        for bunch in index.bunches() {
            assert!(!bunch.is_empty());
            assert!(bunch.iter().all(|t| t.get(position) == bunch.key()));
        }
    }

    for s in 0..12u32 {
        let expected = model.iter().filter(|(ms, _, _)| *ms == s).count();
        let found = collect(&store, slot(&format!("s{s}")), Slot::Any, Slot::Any)?;
        assert_eq!(found.len(), expected);
    }
    for p in 0..4u32 {
        for o in 0..12u32 {
            let expected = model.iter().any(|(_, mp, mo)| *mp == p && *mo == o);
            let found =
                store.contains(&Slot::Any, &slot(&format!("p{p}")), &slot(&format!("o{o}")))?;
            assert_eq!(found, expected, "(?, p{p}, o{o})");
        }
    }
    Ok(())
}

#[test]
fn bunches_promote_past_threshold() -> Result<()> {
    let mut store = open_store(4);
    for i in 0..10 {
        store.add(&iri("hub"), &iri("p"), &iri(&format!("o{i}")))?;
    }
    let subject = store.dictionary().lookup(&iri("hub"))?.ok_or(PenumbraError::NotFound)?;
    let bunch = store
        .index(Position::Subject)
        .find_bunch(subject)
        .ok_or(PenumbraError::NotFound)?;
    assert!(!bunch.is_array());
    assert_eq!(bunch.len(), 10);

    let stats = store.stats();
    assert_eq!(stats.triples, 10);
    assert!(stats.hash_bunches >= 2);
    Ok(())
}

#[test]
fn find_ids_matches_term_level_find() -> Result<()> {
    let mut store = open_store(16);
    for i in 0..5 {
        store.add(&iri(&format!("s{i}")), &iri("p"), &iri("o"))?;
    }
    let p = store.dictionary().lookup(&iri("p"))?;
    let ids: Vec<Triple> = store
        .find_ids(TriplePattern::new(None, p, None))
        .collect();
    assert_eq!(ids.len(), 5);
    let terms = collect(&store, Slot::Any, slot("p"), Slot::Any)?;
    assert_eq!(terms.len(), 5);
    Ok(())
}

#[test]
fn selectivity_prefers_object_index() -> Result<()> {
    let metrics = Arc::new(CounterMetrics::default());
    let store: Arc<dyn DurableTermStore> = Arc::new(MemTermStore::new());
    let mut graph = GraphStore::open(StoreOptions::new(store).metrics(metrics.clone()));
    graph.add(&iri("s"), &iri("p"), &iri("o"))?;

    graph.find(&slot("s"), &Slot::Any, &slot("o"))?.count();
    graph.find(&slot("s"), &slot("p"), &Slot::Any)?.count();
    graph.find(&Slot::Any, &slot("p"), &Slot::Any)?.count();

    use std::sync::atomic::Ordering::Relaxed;
    assert_eq!(metrics.object_scans.load(Relaxed), 1);
    assert_eq!(metrics.subject_scans.load(Relaxed), 1);
    assert_eq!(metrics.predicate_scans.load(Relaxed), 1);
    Ok(())
}

#[test]
fn exhausted_allocation_makes_store_read_only() -> Result<()> {
    let store: Arc<dyn DurableTermStore> = Arc::new(MemTermStore::with_max_ids(3));
    let mut graph = GraphStore::open(StoreOptions::new(store));
    graph.add(&iri("a"), &iri("p"), &iri("b"))?;
    assert_eq!(
        graph.add(&iri("a"), &iri("p"), &iri("c")),
        Err(PenumbraError::AllocationExhausted)
    );
    assert!(graph.is_read_only());
    assert_eq!(graph.len(), 1);
    assert_eq!(
        graph.add(&iri("a"), &iri("p"), &iri("b")),
        Err(PenumbraError::ReadOnly)
    );
    assert_eq!(
        graph.delete(&iri("a"), &iri("p"), &iri("b")),
        Err(PenumbraError::ReadOnly)
    );
    assert!(graph.contains(&slot("a"), &slot("p"), &slot("b"))?);
    Ok(())
}
