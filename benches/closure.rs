//! Benchmarks for closure computation and full extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ontoslice::closure::{ClosureLimits, Direction, Hierarchy, compute_closure};
use ontoslice::config::ExtractConfig;
use ontoslice::extract::Extractor;
use ontoslice::import::{ImportTerm, Intermediates, Relation};
use ontoslice::store::MemStore;
use ontoslice::term::{TermId, Triple, vocab};

/// A tree of `depth` levels with `width` children per node, plus a second
/// parent for every node so that lineages overlap.
fn hierarchy(depth: usize, width: usize) -> MemStore {
    let mut triples = Vec::new();
    let mut level = vec!["EX:n".to_string()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for (i, parent) in level.iter().enumerate() {
            for w in 0..width {
                let child = format!("{parent}_{w}");
                triples.push(Triple::new(child.as_str(), vocab::RDFS_SUBCLASS_OF, parent.as_str()));
                if let Some(other) = level.get(i + 1) {
                    triples.push(Triple::new(child.as_str(), vocab::RDFS_SUBCLASS_OF, other.as_str()));
                }
                next.push(child);
            }
        }
        level = next;
    }
    MemStore::from_triples(triples)
}

fn deepest(depth: usize) -> TermId {
    TermId::new(format!("EX:n{}", "_0".repeat(depth)))
}

fn bench_ancestors(c: &mut Criterion) {
    let store = hierarchy(8, 3);
    let hierarchy = Hierarchy::default();
    let seed = deepest(8);

    c.bench_function("ancestors_depth8_width3", |bench| {
        bench.iter(|| {
            black_box(
                compute_closure(&store, &seed, &hierarchy, Direction::Ancestors, ClosureLimits::default())
                    .unwrap(),
            )
        })
    });
}

fn bench_descendants(c: &mut Criterion) {
    let store = hierarchy(7, 3);
    let hierarchy = Hierarchy::default();
    let root = TermId::from("EX:n");

    c.bench_function("descendants_depth7_width3", |bench| {
        bench.iter(|| {
            black_box(
                compute_closure(&store, &root, &hierarchy, Direction::Descendants, ClosureLimits::default())
                    .unwrap(),
            )
        })
    });
}

fn bench_extract(c: &mut Criterion) {
    let store = hierarchy(7, 3);
    let terms: Vec<ImportTerm> = (0..3)
        .map(|w| {
            ImportTerm::new(format!("EX:n{}_{w}", "_0".repeat(6)))
                .with_related([Relation::Ancestors, Relation::Children])
        })
        .collect();

    for intermediates in [Intermediates::All, Intermediates::None] {
        let config = ExtractConfig {
            intermediates,
            ..Default::default()
        };
        let extractor = Extractor::new(&store, config);
        c.bench_function(&format!("extract_intermediates_{intermediates}"), |bench| {
            bench.iter(|| black_box(extractor.extract(&terms, None).unwrap()))
        });
    }
}

criterion_group!(benches, bench_ancestors, bench_descendants, bench_extract);
criterion_main!(benches);
