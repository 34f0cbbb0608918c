//! Benchmarks for the force-directed layout step.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use kiji_benches::synthetic_corpus;
use kiji_core::{ForceDirectedLayout, LayoutTunables};

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_step");
    for &events in &[200usize, 2_000] {
        let corpus = synthetic_corpus(events, events / 2, 8, 8, 17);
        group.bench_with_input(BenchmarkId::from_parameter(events), &events, |b, _| {
            let mut layout =
                ForceDirectedLayout::new(&corpus.index, LayoutTunables::default(), 23);
            b.iter(|| layout.step(&corpus.index));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
