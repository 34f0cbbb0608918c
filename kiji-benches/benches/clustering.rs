//! Benchmarks for the vectorize-and-cluster path.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use std::num::NonZeroUsize;

use kiji_benches::synthetic_corpus;
use kiji_core::{CancelToken, CoreContext, EventVectorizer, Hdbscan, HdbscanParams};

const DIMENSION: usize = 32;

fn bench_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorize");
    for &events in &[200usize, 1_000] {
        let corpus = synthetic_corpus(events, events / 4, 6, DIMENSION, 11);
        let ctx = CoreContext::new(NonZeroUsize::new(DIMENSION).expect("non-zero dimension"));
        let vectorizer = EventVectorizer::new(ctx);
        let idf = vectorizer.compute_idf(&corpus.index);
        group.bench_with_input(BenchmarkId::from_parameter(events), &events, |b, _| {
            b.iter(|| {
                vectorizer
                    .build(&corpus.index, &corpus.embeddings, &idf, &CancelToken::new())
                    .expect("vectorization must succeed")
            });
        });
    }
    group.finish();
}

fn bench_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("hdbscan");
    group.sample_size(10);
    for &events in &[200usize, 800] {
        let corpus = synthetic_corpus(events, events / 4, 6, DIMENSION, 13);
        let ctx = CoreContext::new(NonZeroUsize::new(DIMENSION).expect("non-zero dimension"));
        let vectorizer = EventVectorizer::new(ctx);
        let idf = vectorizer.compute_idf(&corpus.index);
        let vectors = vectorizer
            .build(&corpus.index, &corpus.embeddings, &idf, &CancelToken::new())
            .expect("vectorization must succeed");
        let points: Vec<Vec<f32>> = (0..vectors.len()).map(|row| vectors.row(row).to_vec()).collect();
        let clusterer = Hdbscan::new(HdbscanParams::try_new(10, 5).expect("positive parameters"));
        group.bench_with_input(BenchmarkId::from_parameter(events), &events, |b, _| {
            b.iter(|| {
                clusterer
                    .run(&points, &CancelToken::new())
                    .expect("clustering must succeed")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_vectorize, bench_cluster);
criterion_main!(benches);
