//! Benchmarks for multi-hop path search.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use kiji_benches::synthetic_corpus;
use kiji_core::{CancelToken, NodeId, PathFinder, PathQuery};

fn bench_find_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("pathfinder");
    for &events in &[500usize, 2_000] {
        let corpus = synthetic_corpus(events, events / 4, 6, 8, 29);
        let finder = PathFinder::new(&corpus.index);
        let query = PathQuery::new(vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)])
            .with_max_depth(4)
            .with_max_paths(5);
        group.bench_with_input(BenchmarkId::from_parameter(events), &events, |b, _| {
            b.iter(|| finder.find_paths(&query, &CancelToken::new()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find_paths);
criterion_main!(benches);
