//! IDF weighting and event-vector construction.
//!
//! Every hyperedge with at least one embedded source- or target-role
//! participant becomes a dense event vector of width `3·D + F`: the
//! IDF-weighted pooled source mean, the pooled target mean, their
//! difference, and a one-hot relation-family block. Pooled means are
//! computed first, the difference is taken from the raw means, and only
//! then are all three blocks normalised independently; this order is a
//! contract, not an implementation detail.

use std::{collections::HashMap, sync::Arc};

use tracing::{info, instrument, warn};

use crate::{
    cancel::CancelToken,
    config::CoreContext,
    error::{CoreError, Result, Stage},
    hypergraph::{EdgeId, HypergraphIndex, NodeId, Role},
    relation::RelationFamily,
    vecops,
};

/// Read-only mapping from node labels to dense embeddings.
///
/// A node without an embedding is valid; it simply drops out of pooling.
pub trait EmbeddingSource {
    /// Returns a human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Returns the nominal embedding dimension `D`.
    fn dimension(&self) -> usize;

    /// Returns the number of stored embeddings.
    fn len(&self) -> usize;

    /// Returns whether the source holds no embeddings.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the embedding for a case-sensitive node label.
    fn embedding(&self, label: &str) -> Option<&[f32]>;
}

/// HashMap-backed [`EmbeddingSource`].
#[derive(Debug, Clone, Default)]
pub struct EmbeddingMap {
    name: String,
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingMap {
    /// Creates an empty map for the given dimension.
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            vectors: HashMap::new(),
        }
    }

    /// Inserts or replaces the embedding for `label`.
    ///
    /// The vector is stored as-is; dimension validation happens at pooling
    /// time so a single bad row surfaces as a diagnostic, not a load failure.
    pub fn insert(&mut self, label: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(label.into(), vector);
    }
}

impl EmbeddingSource for EmbeddingMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn embedding(&self, label: &str) -> Option<&[f32]> {
        self.vectors.get(label).map(Vec::as_slice)
    }
}

/// IDF weights for every node of one build, keyed by node id.
///
/// This table is the only IDF state in a build; the index itself stays
/// immutable so concurrent readers never observe partial weights.
#[derive(Debug, Clone, PartialEq)]
pub struct IdfTable {
    values: Vec<f32>,
    edge_count: usize,
}

impl IdfTable {
    /// Returns the IDF weight for `node`, defaulting to `1.0` off-table.
    #[must_use]
    pub fn weight(&self, node: NodeId) -> f32 {
        self.values.get(node.index()).copied().unwrap_or(1.0)
    }

    /// Returns the number of edges the table was computed over.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns whether the corpus had no edges (the computation was a no-op).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}

/// One build's event vectors in row-major storage.
#[derive(Debug, Clone, PartialEq)]
pub struct EventVectors {
    width: usize,
    data: Vec<f32>,
    edges: Vec<EdgeId>,
    skipped_dimension: usize,
    skipped_unembedded: usize,
}

impl EventVectors {
    /// Returns the number of vectorized events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns whether no event was vectorized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns the vector width `3·D + F`.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the edge id of row `row`.
    #[must_use]
    pub fn edge_id(&self, row: usize) -> Option<EdgeId> {
        self.edges.get(row).copied()
    }

    /// Returns the edge ids in row order.
    #[must_use]
    pub fn edge_ids(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Returns the dense vector of row `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.width;
        &self.data[start..start + self.width]
    }

    /// Returns the row-major backing storage.
    pub(crate) fn matrix(&self) -> &[f32] {
        &self.data
    }

    /// Iterates `(edge, vector)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &[f32])> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(row, &edge)| (edge, self.row(row)))
    }

    /// Returns how many stored embeddings were skipped for dimension mismatch.
    #[must_use]
    pub fn skipped_dimension(&self) -> usize {
        self.skipped_dimension
    }

    /// Returns how many edges had no embedded source or target participant.
    #[must_use]
    pub fn skipped_unembedded(&self) -> usize {
        self.skipped_unembedded
    }
}

/// Builds IDF tables and event vectors for one pipeline run.
#[derive(Debug, Clone)]
pub struct EventVectorizer {
    ctx: CoreContext,
}

impl EventVectorizer {
    /// Creates a vectorizer with the given context.
    #[must_use]
    pub fn new(ctx: CoreContext) -> Self {
        Self { ctx }
    }

    /// Returns the configured context.
    #[must_use]
    pub fn context(&self) -> &CoreContext {
        &self.ctx
    }

    /// Computes `idf(n) = min(ln((N+1)/(df+1)) + 1, idf_max)` for every node.
    ///
    /// A corpus with no edges yields an empty table and the step is a no-op.
    #[instrument(name = "vectorizer.compute_idf", skip(self, index), fields(edges = index.edge_count()))]
    #[must_use]
    pub fn compute_idf(&self, index: &HypergraphIndex) -> IdfTable {
        let edge_count = index.edge_count();
        if edge_count == 0 {
            return IdfTable {
                values: Vec::new(),
                edge_count: 0,
            };
        }

        let numerator = (edge_count + 1) as f64;
        let values = index
            .node_ids()
            .map(|node| {
                let df = index.degree(node);
                let raw = (numerator / (df + 1) as f64).ln() + 1.0;
                (raw as f32).min(self.ctx.idf_max())
            })
            .collect();
        IdfTable { values, edge_count }
    }

    /// Builds event vectors for every edge with embedded participants.
    ///
    /// Edges are processed in ascending id order in batches of
    /// `batch_size`; the cancel token is polled between batches.
    ///
    /// # Errors
    /// Returns [`CoreError::NoEmbeddings`] when `embeddings` is empty and
    /// [`CoreError::Cancelled`] when the token fires between batches.
    #[instrument(
        name = "vectorizer.build",
        err,
        skip(self, index, embeddings, idf, cancel),
        fields(source = embeddings.name(), edges = index.edge_count()),
    )]
    pub fn build<E: EmbeddingSource>(
        &self,
        index: &HypergraphIndex,
        embeddings: &E,
        idf: &IdfTable,
        cancel: &CancelToken,
    ) -> Result<EventVectors> {
        if embeddings.is_empty() {
            return Err(CoreError::NoEmbeddings {
                source_name: Arc::from(embeddings.name()),
            });
        }

        let dimension = self.ctx.dimension().get();
        let width = self.ctx.event_vector_width();
        let batch = self.ctx.batch_size().get();

        let mut out = EventVectors {
            width,
            data: Vec::new(),
            edges: Vec::new(),
            skipped_dimension: 0,
            skipped_unembedded: 0,
        };

        let edge_ids: Vec<EdgeId> = index.edge_ids().collect();
        for chunk in edge_ids.chunks(batch) {
            cancel.checkpoint(Stage::Vectorize)?;
            for &edge in chunk {
                self.vectorize_edge(index, embeddings, idf, edge, dimension, &mut out);
            }
        }

        info!(
            vectorized = out.len(),
            skipped_unembedded = out.skipped_unembedded,
            skipped_dimension = out.skipped_dimension,
            "event vectorization finished"
        );
        Ok(out)
    }

    fn vectorize_edge<E: EmbeddingSource>(
        &self,
        index: &HypergraphIndex,
        embeddings: &E,
        idf: &IdfTable,
        edge: EdgeId,
        dimension: usize,
        out: &mut EventVectors,
    ) {
        let source_mean = self.pooled_mean(index, embeddings, idf, edge, Role::Source, dimension, out);
        let target_mean = self.pooled_mean(index, embeddings, idf, edge, Role::Target, dimension, out);

        let (source_mean, target_mean) = match (source_mean, target_mean) {
            (None, None) => {
                out.skipped_unembedded += 1;
                return;
            }
            (s, t) => (
                s.unwrap_or_else(|| vec![0.0; dimension]),
                t.unwrap_or_else(|| vec![0.0; dimension]),
            ),
        };

        // Difference of the raw pooled means; all three blocks are then
        // normalised independently.
        let mut diff: Vec<f32> = source_mean
            .iter()
            .zip(target_mean.iter())
            .map(|(&s, &t)| s - t)
            .collect();

        let mut source_block = source_mean;
        let mut target_block = target_mean;
        vecops::normalize_in_place(&mut source_block);
        vecops::normalize_in_place(&mut target_block);
        vecops::normalize_in_place(&mut diff);

        let family = RelationFamily::classify(index.verb(edge).unwrap_or(""));

        out.data.extend_from_slice(&source_block);
        out.data.extend_from_slice(&target_block);
        out.data.extend_from_slice(&diff);
        out.data.extend_from_slice(&family.one_hot());
        out.edges.push(edge);
    }

    #[expect(clippy::too_many_arguments, reason = "internal pooling helper")]
    fn pooled_mean<E: EmbeddingSource>(
        &self,
        index: &HypergraphIndex,
        embeddings: &E,
        idf: &IdfTable,
        edge: EdgeId,
        role: Role,
        dimension: usize,
        out: &mut EventVectors,
    ) -> Option<Vec<f32>> {
        let mut vectors: Vec<&[f32]> = Vec::new();
        let mut weights: Vec<f32> = Vec::new();

        for node in index.nodes_by_role(edge, role) {
            let Some(label) = index.node_label(node) else {
                continue;
            };
            let Some(vector) = embeddings.embedding(label) else {
                continue;
            };
            if vector.len() != dimension {
                out.skipped_dimension += 1;
                warn!(
                    label,
                    expected = dimension,
                    got = vector.len(),
                    "skipping embedding with mismatched dimension"
                );
                continue;
            }
            vectors.push(vector);
            weights.push(idf.weight(node));
        }

        vecops::weighted_mean(&vectors, &weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    use crate::hypergraph::{HypergraphBuilder, Triple};

    fn ctx(dimension: usize) -> CoreContext {
        CoreContext::new(NonZeroUsize::new(dimension).expect("test dimension is non-zero"))
    }

    fn single_edge_index() -> HypergraphIndex {
        let mut builder = HypergraphBuilder::new();
        builder
            .add_triple(Triple::new("acquired", ["Apple"], ["Beats"], 1))
            .expect("triple has participants");
        builder.finish()
    }

    fn axis_embeddings(dimension: usize) -> EmbeddingMap {
        let mut map = EmbeddingMap::new("axes", dimension);
        let mut apple = vec![0.0; dimension];
        apple[0] = 1.0;
        let mut beats = vec![0.0; dimension];
        beats[1] = 1.0;
        map.insert("Apple", apple);
        map.insert("Beats", beats);
        map
    }

    #[test]
    fn idf_of_ubiquitous_node_is_one() {
        let mut builder = HypergraphBuilder::new();
        let rejected = builder.add_all(vec![
            Triple::new("announced", ["N"], ["A"], 1),
            Triple::new("announced", ["N"], ["B"], 2),
            Triple::new("announced", ["N"], ["C"], 3),
        ]);
        assert_eq!(rejected, 0);
        let index = builder.finish();
        let vectorizer = EventVectorizer::new(ctx(2));
        let idf = vectorizer.compute_idf(&index);

        let n = index.node_id("N").expect("N must be indexed");
        assert!((idf.weight(n) - 1.0).abs() < 1e-6);
        for node in index.node_ids() {
            let weight = idf.weight(node);
            assert!(weight > 0.0 && weight <= 6.0);
        }
    }

    #[test]
    fn idf_is_monotone_in_document_frequency() {
        let mut builder = HypergraphBuilder::new();
        let rejected = builder.add_all(vec![
            Triple::new("announced", ["Common"], ["Rare"], 1),
            Triple::new("announced", ["Common"], ["Mid"], 2),
            Triple::new("announced", ["Common", "Mid"], ["Other"], 3),
        ]);
        assert_eq!(rejected, 0);
        let index = builder.finish();
        let idf = EventVectorizer::new(ctx(2)).compute_idf(&index);

        let common = index.node_id("Common").expect("indexed");
        let mid = index.node_id("Mid").expect("indexed");
        let rare = index.node_id("Rare").expect("indexed");
        assert!(idf.weight(common) <= idf.weight(mid));
        assert!(idf.weight(mid) <= idf.weight(rare));
    }

    #[test]
    fn empty_corpus_idf_is_noop() {
        let index = HypergraphBuilder::new().finish();
        let idf = EventVectorizer::new(ctx(2)).compute_idf(&index);
        assert!(idf.is_empty());
    }

    #[test]
    fn empty_embedding_source_is_refused() {
        let index = single_edge_index();
        let vectorizer = EventVectorizer::new(ctx(4));
        let idf = vectorizer.compute_idf(&index);
        let err = vectorizer
            .build(&index, &EmbeddingMap::new("empty", 4), &idf, &CancelToken::new())
            .expect_err("empty embeddings must be refused");
        assert_eq!(err.code().as_str(), "KIJI_NO_EMBEDDINGS");
    }

    #[test]
    fn single_edge_layout_matches_contract() {
        let dimension = 4;
        let index = single_edge_index();
        let vectorizer = EventVectorizer::new(ctx(dimension));
        let idf = vectorizer.compute_idf(&index);
        let vectors = vectorizer
            .build(&index, &axis_embeddings(dimension), &idf, &CancelToken::new())
            .expect("vectorization must succeed");

        assert_eq!(vectors.len(), 1);
        let row = vectors.row(0);
        let (source, rest) = row.split_at(dimension);
        let (target, rest) = rest.split_at(dimension);
        let (diff, family) = rest.split_at(dimension);

        assert!((source[0] - 1.0).abs() < 1e-6);
        assert!((target[1] - 1.0).abs() < 1e-6);
        let inv_sqrt2 = std::f32::consts::FRAC_1_SQRT_2;
        assert!((diff[0] - inv_sqrt2).abs() < 1e-6);
        assert!((diff[1] + inv_sqrt2).abs() < 1e-6);
        assert_eq!(family[RelationFamily::Acquire.index()], 1.0);
        assert_eq!(family.iter().filter(|&&v| v == 1.0).count(), 1);
    }

    #[test]
    fn unembedded_edges_are_excluded() {
        let mut builder = HypergraphBuilder::new();
        let rejected = builder.add_all(vec![
            Triple::new("acquired", ["Apple"], ["Beats"], 1),
            Triple::new("acquired", ["Ghost"], ["Phantom"], 2),
        ]);
        assert_eq!(rejected, 0);
        let index = builder.finish();
        let vectorizer = EventVectorizer::new(ctx(4));
        let idf = vectorizer.compute_idf(&index);
        let vectors = vectorizer
            .build(&index, &axis_embeddings(4), &idf, &CancelToken::new())
            .expect("vectorization must succeed");

        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors.skipped_unembedded(), 1);
        assert_eq!(vectors.edge_id(0).map(EdgeId::get), Some(0));
    }

    #[test]
    fn mismatched_dimension_is_skipped_with_count() {
        let index = single_edge_index();
        let vectorizer = EventVectorizer::new(ctx(4));
        let idf = vectorizer.compute_idf(&index);

        let mut map = axis_embeddings(4);
        map.insert("Apple", vec![1.0, 0.0]);
        let vectors = vectorizer
            .build(&index, &map, &idf, &CancelToken::new())
            .expect("vectorization must succeed");

        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors.skipped_dimension(), 1);
        // The source side pooled nothing, so its block is all zeros.
        let row = vectors.row(0);
        assert!(row[..4].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn embedding_lookups_are_per_participant() {
        use std::sync::{Arc, atomic::AtomicUsize};

        use crate::test_utils::CountingEmbeddings;

        let index = single_edge_index();
        let vectorizer = EventVectorizer::new(ctx(4));
        let idf = vectorizer.compute_idf(&index);
        let lookups = Arc::new(AtomicUsize::new(0));
        let embeddings = CountingEmbeddings::new(axis_embeddings(4), Arc::clone(&lookups));

        vectorizer
            .build(&index, &embeddings, &idf, &CancelToken::new())
            .expect("vectorization must succeed");

        // One source and one target participant, each looked up once.
        assert_eq!(embeddings.lookups(), 2);
    }

    #[test]
    fn cancellation_between_batches_unwinds() {
        let index = single_edge_index();
        let vectorizer = EventVectorizer::new(ctx(4));
        let idf = vectorizer.compute_idf(&index);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = vectorizer
            .build(&index, &axis_embeddings(4), &idf, &cancel)
            .expect_err("cancelled token must stop the build");
        assert!(err.is_cancelled());
    }

    #[test]
    fn block_norms_are_zero_or_one() {
        let dimension = 3;
        let mut builder = HypergraphBuilder::new();
        let rejected = builder.add_all(vec![
            Triple::new("supplies", ["A", "B"], ["C"], 1),
            Triple::new("supplies", ["A"], ["Unknown"], 2),
        ]);
        assert_eq!(rejected, 0);
        let index = builder.finish();

        let mut map = EmbeddingMap::new("fixtures", dimension);
        map.insert("A", vec![1.0, 2.0, 0.0]);
        map.insert("B", vec![0.0, 1.0, 1.0]);
        map.insert("C", vec![0.5, 0.5, 0.5]);

        let vectorizer = EventVectorizer::new(ctx(dimension));
        let idf = vectorizer.compute_idf(&index);
        let vectors = vectorizer
            .build(&index, &map, &idf, &CancelToken::new())
            .expect("vectorization must succeed");

        for (_, row) in vectors.iter() {
            for block in [&row[..dimension], &row[dimension..2 * dimension], &row[2 * dimension..3 * dimension]] {
                let norm = vecops::l2_norm(block);
                assert!(norm.abs() < 1e-6 || (norm - 1.0).abs() < 1e-5);
            }
        }
    }
}
