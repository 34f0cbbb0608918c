//! Synthetic corpora for benchmarking the kiji pipeline.

use rand::{Rng, SeedableRng, rngs::SmallRng};

use kiji_core::{EmbeddingMap, HypergraphBuilder, HypergraphIndex, Triple};

/// Verbs sampled when generating synthetic corpora.
const VERBS: &[&str] = &[
    "acquired",
    "announced",
    "launched",
    "sued",
    "supplies",
    "invested in",
    "partnered with",
];

/// A generated corpus: the sealed index plus matching embeddings.
pub struct SyntheticCorpus {
    /// Sealed hypergraph over the generated triples.
    pub index: HypergraphIndex,
    /// Embeddings for every generated entity.
    pub embeddings: EmbeddingMap,
}

/// Generates a corpus of `events` triples over `entities` entities grouped
/// into `topics` well-separated embedding neighbourhoods.
///
/// Entities within a topic share an embedding neighbourhood, so events
/// drawn from one topic cluster together downstream. Output is fully
/// determined by `seed`.
#[must_use]
pub fn synthetic_corpus(
    events: usize,
    entities: usize,
    topics: usize,
    dimension: usize,
    seed: u64,
) -> SyntheticCorpus {
    let mut rng = SmallRng::seed_from_u64(seed);
    let topics = topics.max(1);
    let entities = entities.max(2);

    let mut embeddings = EmbeddingMap::new("synthetic", dimension);
    let labels: Vec<String> = (0..entities).map(|i| format!("Entity{i}")).collect();
    for (i, label) in labels.iter().enumerate() {
        let topic = i % topics;
        let mut vector = vec![0.0f32; dimension];
        if dimension > 0 {
            vector[topic % dimension] = 10.0;
        }
        for value in &mut vector {
            *value += rng.gen_range(-0.05..=0.05);
        }
        embeddings.insert(label.clone(), vector);
    }

    let mut builder = HypergraphBuilder::new();
    for chunk in 0..events {
        let topic = chunk % topics;
        let pick = |rng: &mut SmallRng| {
            let offset = rng.gen_range(0..entities / topics.min(entities)) * topics + topic;
            labels[offset.min(entities - 1)].clone()
        };
        let source = pick(&mut rng);
        let mut target = pick(&mut rng);
        if target == source {
            target = labels[(chunk + 1) % entities].clone();
        }
        let verb = VERBS[chunk % VERBS.len()];
        builder
            .add_triple(Triple::new(verb, [source], [target], chunk as u64))
            .expect("generated triples always have participants");
    }

    SyntheticCorpus {
        index: builder.finish(),
        embeddings,
    }
}
