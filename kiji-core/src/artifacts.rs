//! Per-cluster artifacts: centroids, exemplars, top entities, auto-labels.
//!
//! Artifacts are wholly recreated each pipeline run. Ranking rules are
//! deterministic: cosine ties resolve to the smaller event id, entity-score
//! ties to the lexicographically smaller label, and family-count ties to
//! the smaller family name.

use tracing::instrument;

use crate::{
    cancel::CancelToken,
    error::{Result, Stage},
    hdbscan::Labeling,
    hypergraph::{EdgeId, HypergraphIndex},
    relation::RelationFamily,
    vecops,
    vectorizer::{EventVectors, IdfTable},
};

/// Maximum exemplars persisted per cluster.
pub const MAX_EXEMPLARS: usize = 10;

/// Maximum top entities persisted per cluster.
pub const MAX_TOP_ENTITIES: usize = 20;

/// Maximum top relation families persisted per cluster.
pub const MAX_TOP_FAMILIES: usize = 5;

/// An entity ranked by aggregate IDF weight across a cluster's edges.
#[derive(Debug, Clone, PartialEq)]
pub struct TopEntity {
    /// Node label.
    pub label: String,
    /// Summed IDF weight over member edges mentioning the label.
    pub score: f32,
}

/// A relation family ranked by occurrence count across a cluster's edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopFamily {
    /// The relation family.
    pub family: RelationFamily,
    /// Number of member edges classified into the family.
    pub count: usize,
}

/// A member event ranked by cosine similarity to the cluster centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exemplar {
    /// Event id of the exemplar.
    pub event: EdgeId,
    /// Cosine similarity to the centroid.
    pub similarity: f32,
    /// Zero-based rank, densest first.
    pub rank: usize,
}

/// Everything persisted about one cluster besides its member rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    /// Cluster label within the build.
    pub cluster: i64,
    /// Number of member events.
    pub size: usize,
    /// Normalised mean of member event vectors.
    pub centroid: Vec<f32>,
    /// Up to [`MAX_TOP_ENTITIES`] entities by aggregate IDF.
    pub top_entities: Vec<TopEntity>,
    /// Up to [`MAX_TOP_FAMILIES`] families by count.
    pub top_families: Vec<TopFamily>,
    /// Up to [`MAX_EXEMPLARS`] member events nearest the centroid.
    pub exemplars: Vec<Exemplar>,
    /// Human-readable label derived from entities and the top family.
    pub auto_label: String,
}

/// Builds cluster summaries for every non-noise cluster.
///
/// # Errors
/// Returns [`crate::CoreError::Cancelled`] when the token fires between
/// clusters.
#[instrument(
    name = "artifacts.build",
    err,
    skip_all,
    fields(clusters = labeling.cluster_count()),
)]
pub fn build_cluster_summaries(
    index: &HypergraphIndex,
    idf: &IdfTable,
    vectors: &EventVectors,
    labeling: &Labeling,
    cancel: &CancelToken,
) -> Result<Vec<ClusterSummary>> {
    let mut summaries = Vec::with_capacity(labeling.cluster_count());
    for cluster in 0..labeling.cluster_count() as i64 {
        cancel.checkpoint(Stage::Artifacts)?;
        let members: Vec<usize> = labeling
            .labels()
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == cluster)
            .map(|(row, _)| row)
            .collect();
        summaries.push(summarise_cluster(index, idf, vectors, cluster, &members));
    }
    Ok(summaries)
}

fn summarise_cluster(
    index: &HypergraphIndex,
    idf: &IdfTable,
    vectors: &EventVectors,
    cluster: i64,
    members: &[usize],
) -> ClusterSummary {
    let centroid = centroid_of(vectors, members);
    let exemplars = rank_exemplars(vectors, members, &centroid);
    let top_entities = rank_entities(index, idf, vectors, members);
    let top_families = rank_families(index, vectors, members);
    let auto_label = auto_label(&top_entities, &top_families);

    ClusterSummary {
        cluster,
        size: members.len(),
        centroid,
        top_entities,
        top_families,
        exemplars,
        auto_label,
    }
}

fn centroid_of(vectors: &EventVectors, members: &[usize]) -> Vec<f32> {
    let mut centroid = vec![0.0f32; vectors.width()];
    for &row in members {
        vecops::add_assign(&mut centroid, vectors.row(row));
    }
    if !members.is_empty() {
        vecops::scale(&mut centroid, 1.0 / members.len() as f32);
    }
    vecops::normalize_in_place(&mut centroid);
    centroid
}

fn rank_exemplars(vectors: &EventVectors, members: &[usize], centroid: &[f32]) -> Vec<Exemplar> {
    let mut scored: Vec<(EdgeId, f32)> = members
        .iter()
        .filter_map(|&row| {
            vectors
                .edge_id(row)
                .map(|edge| (edge, vecops::cosine(vectors.row(row), centroid)))
        })
        .collect();
    scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored
        .into_iter()
        .take(MAX_EXEMPLARS)
        .enumerate()
        .map(|(rank, (event, similarity))| Exemplar {
            event,
            similarity,
            rank,
        })
        .collect()
}

fn rank_entities(
    index: &HypergraphIndex,
    idf: &IdfTable,
    vectors: &EventVectors,
    members: &[usize],
) -> Vec<TopEntity> {
    let mut scores: Vec<(String, f32)> = Vec::new();
    for &row in members {
        let Some(edge) = vectors.edge_id(row) else {
            continue;
        };
        for &node in index.nodes_of(edge) {
            let Some(label) = index.node_label(node) else {
                continue;
            };
            match scores.iter().position(|(existing, _)| existing == label) {
                Some(found) => scores[found].1 += idf.weight(node),
                None => scores.push((label.to_owned(), idf.weight(node))),
            }
        }
    }
    scores.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scores
        .into_iter()
        .take(MAX_TOP_ENTITIES)
        .map(|(label, score)| TopEntity { label, score })
        .collect()
}

fn rank_families(
    index: &HypergraphIndex,
    vectors: &EventVectors,
    members: &[usize],
) -> Vec<TopFamily> {
    let mut counts = [0usize; crate::relation::FAMILY_COUNT];
    for &row in members {
        let Some(edge) = vectors.edge_id(row) else {
            continue;
        };
        let family = RelationFamily::classify(index.verb(edge).unwrap_or(""));
        counts[family.index()] += 1;
    }
    let mut ranked: Vec<TopFamily> = RelationFamily::ALL
        .iter()
        .map(|&family| TopFamily {
            family,
            count: counts[family.index()],
        })
        .filter(|entry| entry.count > 0)
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.family.as_str().cmp(b.family.as_str()))
    });
    ranked.truncate(MAX_TOP_FAMILIES);
    ranked
}

fn auto_label(entities: &[TopEntity], families: &[TopFamily]) -> String {
    match (entities, families.first()) {
        ([first, second, ..], Some(top)) => {
            format!("{}, {} \u{2014} {}", first.label, second.label, top.family)
        }
        ([first, second, ..], None) => format!("{}, {}", first.label, second.label),
        ([only], _) => only.label.clone(),
        ([], _) => "Cluster".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    use crate::{
        config::CoreContext,
        hdbscan::{Hdbscan, HdbscanParams},
        hypergraph::{HypergraphBuilder, Triple},
        vectorizer::{EmbeddingMap, EventVectorizer},
    };

    fn fixture() -> (HypergraphIndex, IdfTable, EventVectors, Labeling) {
        let mut builder = HypergraphBuilder::new();
        let rejected = builder.add_all(vec![
            Triple::new("acquired", ["Apple"], ["Beats"], 1),
            Triple::new("acquired", ["Apple"], ["Shazam"], 2),
            Triple::new("acquired", ["Apple"], ["Beats"], 3),
            Triple::new("sued", ["DOJ"], ["Google"], 4),
            Triple::new("sued", ["DOJ"], ["Google"], 5),
            Triple::new("sued", ["DOJ"], ["Meta"], 6),
        ]);
        assert_eq!(rejected, 0);
        let index = builder.finish();

        let dimension = 4;
        let mut map = EmbeddingMap::new("fixtures", dimension);
        map.insert("Apple", vec![1.0, 0.0, 0.0, 0.0]);
        map.insert("Beats", vec![0.9, 0.1, 0.0, 0.0]);
        map.insert("Shazam", vec![0.8, 0.2, 0.0, 0.0]);
        map.insert("DOJ", vec![0.0, 0.0, 1.0, 0.0]);
        map.insert("Google", vec![0.0, 0.0, 0.9, 0.1]);
        map.insert("Meta", vec![0.0, 0.0, 0.8, 0.2]);

        let ctx = CoreContext::new(NonZeroUsize::new(dimension).expect("non-zero"));
        let vectorizer = EventVectorizer::new(ctx);
        let idf = vectorizer.compute_idf(&index);
        let vectors = vectorizer
            .build(&index, &map, &idf, &CancelToken::new())
            .expect("vectorization must succeed");

        let clusterer = Hdbscan::new(HdbscanParams::try_new(2, 2).expect("positive"));
        let labeling = clusterer
            .run_matrix(
                vectors.len(),
                vectors.width(),
                vectors.matrix(),
                &CancelToken::new(),
            )
            .expect("clustering must succeed");
        (index, idf, vectors, labeling)
    }

    #[test]
    fn summaries_cover_every_cluster() {
        let (index, idf, vectors, labeling) = fixture();
        let summaries = build_cluster_summaries(
            &index,
            &idf,
            &vectors,
            &labeling,
            &CancelToken::new(),
        )
        .expect("artifacts must build");
        assert_eq!(summaries.len(), labeling.cluster_count());
        let total: usize = summaries.iter().map(|s| s.size).sum();
        assert_eq!(total + labeling.noise_count(), labeling.len());
    }

    #[test]
    fn centroids_are_unit_norm() {
        let (index, idf, vectors, labeling) = fixture();
        let summaries = build_cluster_summaries(
            &index,
            &idf,
            &vectors,
            &labeling,
            &CancelToken::new(),
        )
        .expect("artifacts must build");
        for summary in &summaries {
            let norm = vecops::l2_norm(&summary.centroid);
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn exemplars_are_ranked_and_bounded() {
        let (index, idf, vectors, labeling) = fixture();
        let summaries = build_cluster_summaries(
            &index,
            &idf,
            &vectors,
            &labeling,
            &CancelToken::new(),
        )
        .expect("artifacts must build");
        for summary in &summaries {
            assert!(summary.exemplars.len() <= MAX_EXEMPLARS);
            for pair in summary.exemplars.windows(2) {
                assert!(pair[0].similarity >= pair[1].similarity);
            }
            for (rank, exemplar) in summary.exemplars.iter().enumerate() {
                assert_eq!(exemplar.rank, rank);
            }
        }
    }

    #[test]
    fn auto_label_joins_entities_and_family() {
        let entities = vec![
            TopEntity {
                label: "Apple".to_owned(),
                score: 3.0,
            },
            TopEntity {
                label: "Beats".to_owned(),
                score: 2.0,
            },
        ];
        let families = vec![TopFamily {
            family: RelationFamily::Acquire,
            count: 3,
        }];
        assert_eq!(auto_label(&entities, &families), "Apple, Beats \u{2014} acquire");
        assert_eq!(auto_label(&entities[..1], &families), "Apple");
        assert_eq!(auto_label(&[], &families), "Cluster");
    }

    #[test]
    fn entity_ties_break_by_label() {
        let (index, idf, vectors, labeling) = fixture();
        let summaries = build_cluster_summaries(
            &index,
            &idf,
            &vectors,
            &labeling,
            &CancelToken::new(),
        )
        .expect("artifacts must build");
        for summary in &summaries {
            for pair in summary.top_entities.windows(2) {
                let ordered = pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].label <= pair[1].label);
                assert!(ordered);
            }
        }
    }
}
