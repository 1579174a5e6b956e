#![allow(clippy::all)]

use std::sync::Arc;
use std::thread;

use penumbra::{
    storage::{DurableTermStore, MemTermStore, SharedGraph},
    PenumbraError, RdfTerm, Result, Slot, StoreOptions,
};

fn shared() -> SharedGraph {
    let store: Arc<dyn DurableTermStore> = Arc::new(MemTermStore::new());
    SharedGraph::open(StoreOptions::new(store).promotion_threshold(8))
}

fn iri(s: &str) -> RdfTerm {
    RdfTerm::iri(format!("http://example.org/{s}"))
}

#[test]
fn concurrent_readers_see_consistent_counts() -> Result<()> {
    let graph = shared();
    for i in 0..200 {
        graph.add(&iri(&format!("s{}", i % 10)), &iri("p"), &iri(&format!("o{i}")))?;
    }

    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let graph = graph.clone();
                scope.spawn(move || -> Result<usize> {
                    let subject = Slot::Bound(iri(&format!("s{worker}")));
                    let guard = graph.read();
                    let matches = guard.find(&subject, &Slot::Any, &Slot::Any)?;
                    matches.collect::<Result<Vec<_>>>().map(|v| v.len())
                })
            })
            .collect();
        for handle in handles {
            let found = handle.join().expect("reader thread panicked")?;
            assert_eq!(found, 20);
        }
        Ok(())
    })
}

#[test]
fn writer_and_readers_interleave() -> Result<()> {
    let graph = shared();
    thread::scope(|scope| {
        let writer = {
            let graph = graph.clone();
            scope.spawn(move || -> Result<()> {
                for i in 0..500 {
                    graph.add(&iri("s"), &iri("p"), &iri(&format!("o{i}")))?;
                }
                Ok(())
            })
        };
        let reader = {
            let graph = graph.clone();
            scope.spawn(move || -> Result<()> {
                for _ in 0..50 {
                    let guard = graph.read();
                    let len = guard.len();
                    let seen = guard
                        .find(&Slot::Any, &Slot::Any, &Slot::Any)?
                        .collect::<Result<Vec<_>>>()?
                        .len();
                    assert_eq!(seen, len);
                }
                Ok(())
            })
        };
        writer.join().expect("writer panicked")?;
        reader.join().expect("reader panicked")
    })?;
    assert_eq!(graph.len(), 500);
    Ok(())
}

#[test]
fn detached_cursor_fails_fast_on_concurrent_add() -> Result<()> {
    let graph = shared();
    for i in 0..10 {
        graph.add(&iri("s"), &iri("p"), &iri(&format!("o{i}")))?;
    }
    let mut cursor = graph
        .cursor(&Slot::Bound(iri("s")), &Slot::Any, &Slot::Any)?
        .with_batch_size(4);
    for _ in 0..4 {
        assert!(cursor.next().transpose()?.is_some());
    }

    let writer = graph.clone();
    thread::spawn(move || writer.delete(&iri("s"), &iri("p"), &iri("o0")))
        .join()
        .expect("writer panicked")?;

    assert_eq!(
        cursor.next().transpose(),
        Err(PenumbraError::ConcurrentModification)
    );
    assert!(cursor.next().is_none());
    Ok(())
}

#[test]
fn small_batches_drain_a_large_bunch() -> Result<()> {
    let graph = shared();
    {
        let mut store = graph.write();
        for i in 0..5_000 {
            store.add(&iri("hub"), &iri("p"), &iri(&format!("o{i}")))?;
        }
    }
    let mut seen = std::collections::HashSet::new();
    for triple in graph
        .cursor(&Slot::Bound(iri("hub")), &Slot::Any, &Slot::Any)?
        .with_batch_size(16)
    {
        assert!(seen.insert(triple?), "cursor yielded a triple twice");
    }
    assert_eq!(seen.len(), 5_000);
    Ok(())
}

#[test]
fn decode_and_lookup_through_handle() -> Result<()> {
    let graph = shared();
    let id = graph.encode(&iri("term"))?;
    assert_eq!(graph.lookup(&iri("term"))?, Some(id));
    assert_eq!(graph.decode(id)?, iri("term"));
    assert!(graph.is_empty());
    Ok(())
}
