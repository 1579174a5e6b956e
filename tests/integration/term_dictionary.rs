#![allow(clippy::all)]

use std::sync::Arc;

use penumbra::{
    model::Literal,
    storage::{
        catalog::{DictOptions, TermDictionary},
        durable::{DurableTermStore, MemTermStore},
    },
    PenumbraError, RdfTerm, Result, TermId,
};
use rand::{distributions::Alphanumeric, Rng};

fn open_dict(opts: DictOptions) -> (Arc<MemTermStore>, TermDictionary) {
    let mem = Arc::new(MemTermStore::new());
    let store: Arc<dyn DurableTermStore> = mem.clone();
    (mem, TermDictionary::open(store, opts))
}

fn small_caches() -> DictOptions {
    DictOptions {
        id_to_term_cache: 10,
        term_to_id_cache: 10,
        miss_cache: 10,
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(len)
        .collect()
}

#[test]
fn encode_and_decode_roundtrip() -> Result<()> {
    let (_, mut dict) = open_dict(DictOptions::default());
    let terms = [
        RdfTerm::iri("http://example.org/alice"),
        RdfTerm::blank("b0"),
        RdfTerm::literal("hello"),
        RdfTerm::Literal(Literal::lang("bonjour", "fr")),
        RdfTerm::Literal(Literal::typed(
            "42",
            "http://www.w3.org/2001/XMLSchema#integer",
        )),
        RdfTerm::variable("x"),
    ];
    let mut ids = Vec::new();
    for term in &terms {
        ids.push(dict.encode(term)?);
    }
    for (term, id) in terms.iter().zip(&ids) {
        assert_eq!(&dict.decode(*id)?, term);
        assert_eq!(dict.lookup(term)?, Some(*id));
    }

    let snapshot = dict.metrics_snapshot();
    assert_eq!(snapshot.encode_calls, terms.len() as u64);
    assert_eq!(snapshot.encode_allocations, terms.len() as u64);
    assert_eq!(snapshot.decode_cache_misses, 0);
    Ok(())
}

#[test]
fn repeated_encode_is_stable() -> Result<()> {
    let (mem, mut dict) = open_dict(small_caches());
    let term = RdfTerm::iri("http://example.org/stable");
    let first = dict.encode(&term)?;
    for _ in 0..5 {
        assert_eq!(dict.encode(&term)?, first);
    }
    assert_eq!(mem.stats().allocations, 1);
    assert_eq!(dict.metrics_snapshot().encode_hits, 5);
    Ok(())
}

#[test]
fn long_random_terms_roundtrip() -> Result<()> {
    let (_, mut dict) = open_dict(small_caches());
    let mut encoded = Vec::new();
    for len in [1, 64, 512, 4096] {
        let term = RdfTerm::literal(random_string(len));
        encoded.push((dict.encode(&term)?, term));
    }
    // Evict everything cached so decodes go to the durable store.
    for i in 0..20 {
        dict.encode(&RdfTerm::iri(format!("http://example.org/filler/{i}")))?;
    }
    for (id, term) in encoded {
        assert_eq!(dict.decode(id)?, term);
    }
    Ok(())
}

#[test]
fn lookup_after_encode_invalidates_negative_entry() -> Result<()> {
    let (_, mut dict) = open_dict(small_caches());
    let term = RdfTerm::iri("http://example.org/later");
    assert_eq!(dict.lookup(&term)?, None);
    assert_eq!(dict.cache_stats().miss.len, 1);
    assert_eq!(dict.lookup(&term)?, None);
    assert_eq!(dict.metrics_snapshot().miss_cache_hits, 1);

    let id = dict.encode(&term)?;
    assert_eq!(dict.cache_stats().miss.len, 0);
    assert_eq!(dict.lookup(&term)?, Some(id));
    Ok(())
}

#[test]
fn evicted_terms_reload_from_durable_store() -> Result<()> {
    let (mem, mut dict) = open_dict(small_caches());
    let mut ids = Vec::new();
    for i in 0..11 {
        ids.push(dict.encode(&RdfTerm::iri(format!("http://example.org/t{i}")))?);
    }
    let reads_before = mem.stats().reads;
    assert_eq!(dict.decode(ids[0])?, RdfTerm::iri("http://example.org/t0"));
    assert_eq!(mem.stats().reads, reads_before + 1);

    // Now cached again.
    assert_eq!(dict.decode(ids[0])?, RdfTerm::iri("http://example.org/t0"));
    assert_eq!(mem.stats().reads, reads_before + 1);
    assert_eq!(dict.cache_stats().id_to_term.len, 10);
    Ok(())
}

#[test]
fn miss_cache_is_bounded() -> Result<()> {
    let (mem, dict) = open_dict(small_caches());
    let absent: Vec<RdfTerm> = (0..11)
        .map(|i| RdfTerm::iri(format!("http://example.org/absent/{i}")))
        .collect();
    for term in &absent {
        assert_eq!(dict.lookup(term)?, None);
    }
    assert_eq!(dict.cache_stats().miss.len, 10);

    let finds = mem.stats().finds;
    assert_eq!(dict.lookup(&absent[10])?, None);
    assert_eq!(mem.stats().finds, finds, "latest miss is still cached");

    assert_eq!(dict.lookup(&absent[0])?, None);
    assert_eq!(mem.stats().finds, finds + 1, "oldest miss was evicted");
    Ok(())
}

#[test]
fn disabled_caches_still_resolve() -> Result<()> {
    let (mem, mut dict) = open_dict(DictOptions {
        id_to_term_cache: 0,
        term_to_id_cache: 0,
        miss_cache: 0,
    });
    let term = RdfTerm::blank("node");
    let id = dict.encode(&term)?;
    assert_eq!(dict.encode(&term)?, id);
    assert_eq!(dict.decode(id)?, term);
    assert_eq!(dict.lookup(&RdfTerm::blank("other"))?, None);
    assert_eq!(mem.stats().allocations, 1);
    assert!(mem.stats().reads >= 1);
    Ok(())
}

#[test]
fn hyphenated_blank_label_roundtrips() -> Result<()> {
    let (_, mut dict) = open_dict(small_caches());
    let term = RdfTerm::blank("abc-def");
    let id = dict.encode(&term)?;
    assert_eq!(dict.decode(id)?, term);
    assert_eq!(term.to_string(), "_:BabcX2Ddef");
    Ok(())
}

#[test]
fn decode_unknown_id_is_not_found() {
    let (_, dict) = open_dict(DictOptions::default());
    assert_eq!(dict.decode(TermId(999)), Err(PenumbraError::NotFound));
}

#[test]
fn malformed_terms_are_rejected_before_allocation() {
    let (mem, mut dict) = open_dict(DictOptions::default());
    assert!(matches!(
        dict.encode(&RdfTerm::iri("has space")),
        Err(PenumbraError::MalformedTerm(_))
    ));
    assert!(matches!(
        dict.encode(&RdfTerm::Literal(Literal::typed(
            "forty-two",
            "http://www.w3.org/2001/XMLSchema#integer"
        ))),
        Err(PenumbraError::MalformedTerm(_))
    ));
    assert_eq!(mem.stats().allocations, 0);
}

#[test]
fn dictionaries_sharing_a_store_agree_on_ids() -> Result<()> {
    let mem = Arc::new(MemTermStore::new());
    let store: Arc<dyn DurableTermStore> = mem.clone();
    let mut first = TermDictionary::open(store.clone(), small_caches());
    let mut second = TermDictionary::open(store, small_caches());
    let term = RdfTerm::iri("http://example.org/shared");
    let id = first.encode(&term)?;
    assert_eq!(second.lookup(&term)?, Some(id));
    assert_eq!(second.encode(&term)?, id);
    assert_eq!(mem.stats().allocations, 1);
    Ok(())
}
