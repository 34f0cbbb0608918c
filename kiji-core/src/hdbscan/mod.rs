//! Density-based clustering of event vectors.
//!
//! The clusterer runs five sequential phases over `M` vectors: pairwise and
//! core distances, a Prim MST over mutual reachability, single-linkage
//! dendrogram construction, condensation, and Excess-of-Mass selection with
//! flat label assignment. The stage is total: given any vector set it
//! produces a labelling (possibly all noise), and identical inputs always
//! produce identical labels. Cancellation is polled once between phases;
//! each phase is CPU-bound and holds no shared state.

mod condense;
mod dendrogram;
mod matrix;
mod mst;
mod select;

use std::num::NonZeroUsize;

use tracing::{info, instrument};

pub use self::{mst::MstEdge, select::NOISE};

use self::{
    condense::CondensedTree,
    dendrogram::build_dendrogram,
    matrix::DistanceMatrix,
    mst::mutual_reachability_mst,
    select::extract_labels,
};
use crate::{
    cancel::CancelToken,
    error::{CoreError, Result, Stage},
};

/// Clustering parameters before per-corpus capping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdbscanParams {
    min_cluster_size: NonZeroUsize,
    min_samples: NonZeroUsize,
}

impl Default for HdbscanParams {
    fn default() -> Self {
        Self {
            min_cluster_size: NonZeroUsize::new(5).expect("literal 5 is non-zero"),
            min_samples: NonZeroUsize::new(5).expect("literal 5 is non-zero"),
        }
    }
}

impl HdbscanParams {
    /// Creates parameters from validated non-zero values.
    #[must_use]
    pub fn new(min_cluster_size: NonZeroUsize, min_samples: NonZeroUsize) -> Self {
        Self {
            min_cluster_size,
            min_samples,
        }
    }

    /// Creates parameters from raw integers.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidParameters`] when either value is zero or
    /// negative.
    pub fn try_new(min_cluster_size: i64, min_samples: i64) -> Result<Self> {
        let mcs = usize::try_from(min_cluster_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(CoreError::InvalidParameters {
                what: "min_cluster_size",
                got: min_cluster_size,
            })?;
        let ms = usize::try_from(min_samples)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(CoreError::InvalidParameters {
                what: "min_samples",
                got: min_samples,
            })?;
        Ok(Self::new(mcs, ms))
    }

    /// Returns the configured minimum cluster size.
    #[must_use]
    pub fn min_cluster_size(&self) -> NonZeroUsize {
        self.min_cluster_size
    }

    /// Returns the configured minimum samples.
    #[must_use]
    pub fn min_samples(&self) -> NonZeroUsize {
        self.min_samples
    }

    /// Applies the per-corpus caps for `m` points.
    ///
    /// `min_cluster_size` is capped to `max(2, m / 5)` — this can shrink a
    /// caller's parameter dramatically on small corpora — and `min_samples`
    /// never exceeds the capped cluster size.
    #[must_use]
    pub fn effective(&self, m: usize) -> (usize, usize) {
        let cap = (m / 5).max(2);
        let min_cluster_size = self.min_cluster_size.get().min(cap);
        let min_samples = self.min_samples.get().min(min_cluster_size);
        (min_cluster_size, min_samples)
    }
}

/// Flat clustering output; labels use [`NOISE`] (`-1`) for unclustered points.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeling {
    labels: Vec<i64>,
    memberships: Vec<f32>,
    cluster_count: usize,
    effective_min_cluster_size: usize,
    effective_min_samples: usize,
}

impl Labeling {
    fn empty() -> Self {
        Self {
            labels: Vec::new(),
            memberships: Vec::new(),
            cluster_count: 0,
            effective_min_cluster_size: 0,
            effective_min_samples: 0,
        }
    }

    /// Returns the per-point labels in input order.
    #[must_use]
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Returns the label of point `i`.
    #[must_use]
    pub fn label_of(&self, i: usize) -> Option<i64> {
        self.labels.get(i).copied()
    }

    /// Returns the hard membership strength of point `i` (1.0 or 0.0).
    #[must_use]
    pub fn membership(&self, i: usize) -> f32 {
        self.memberships.get(i).copied().unwrap_or(0.0)
    }

    /// Returns the number of clusters (noise excluded).
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Returns the number of noise points.
    #[must_use]
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Returns the number of labelled points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns whether the labelling covers no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns per-cluster sizes indexed by label.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.cluster_count];
        for &label in &self.labels {
            if label >= 0 {
                sizes[label as usize] += 1;
            }
        }
        sizes
    }

    /// Returns the post-cap minimum cluster size used for this run.
    #[must_use]
    pub fn effective_min_cluster_size(&self) -> usize {
        self.effective_min_cluster_size
    }

    /// Returns the post-cap minimum samples used for this run.
    #[must_use]
    pub fn effective_min_samples(&self) -> usize {
        self.effective_min_samples
    }
}

/// The clustering runtime.
#[derive(Debug, Clone, Default)]
pub struct Hdbscan {
    params: HdbscanParams,
}

impl Hdbscan {
    /// Creates a clusterer with the given parameters.
    #[must_use]
    pub fn new(params: HdbscanParams) -> Self {
        Self { params }
    }

    /// Returns the configured parameters.
    #[must_use]
    pub fn params(&self) -> &HdbscanParams {
        &self.params
    }

    /// Clusters `points`, each a vector of identical dimension.
    ///
    /// # Errors
    /// Returns [`CoreError::Cancelled`] when the token fires between phases.
    pub fn run(&self, points: &[Vec<f32>], cancel: &CancelToken) -> Result<Labeling> {
        let width = points.first().map_or(0, Vec::len);
        debug_assert!(points.iter().all(|p| p.len() == width));
        let mut data = Vec::with_capacity(points.len() * width);
        for point in points {
            data.extend_from_slice(point);
        }
        self.run_matrix(points.len(), width, &data, cancel)
    }

    /// Clusters a row-major matrix of `m` vectors of width `width`.
    #[instrument(
        name = "hdbscan.run",
        err,
        skip(self, data, cancel),
        fields(points = m, width = width),
    )]
    pub(crate) fn run_matrix(
        &self,
        m: usize,
        width: usize,
        data: &[f32],
        cancel: &CancelToken,
    ) -> Result<Labeling> {
        if m == 0 {
            return Ok(Labeling::empty());
        }
        let (min_cluster_size, min_samples) = self.params.effective(m);
        if m == 1 {
            return Ok(Labeling {
                labels: vec![NOISE],
                memberships: vec![0.0],
                cluster_count: 0,
                effective_min_cluster_size: min_cluster_size,
                effective_min_samples: min_samples,
            });
        }

        cancel.checkpoint(Stage::CoreDistances)?;
        let matrix = DistanceMatrix::from_rows(m, width, data);
        let k = min_samples.min(m - 1);
        let core = matrix.core_distances(k);

        cancel.checkpoint(Stage::Mst)?;
        let edges = mutual_reachability_mst(&matrix, &core);
        debug_assert_eq!(edges.len(), m - 1);

        cancel.checkpoint(Stage::Dendrogram)?;
        let dendrogram = build_dendrogram(m, &edges);

        cancel.checkpoint(Stage::Condense)?;
        let tree = CondensedTree::from_dendrogram(&dendrogram, min_cluster_size);

        cancel.checkpoint(Stage::Select)?;
        let flat = extract_labels(&tree, &dendrogram);

        let memberships = flat
            .labels
            .iter()
            .map(|&label| if label == NOISE { 0.0 } else { 1.0 })
            .collect();

        let labeling = Labeling {
            labels: flat.labels,
            memberships,
            cluster_count: flat.cluster_count,
            effective_min_cluster_size: min_cluster_size,
            effective_min_samples: min_samples,
        };
        info!(
            clusters = labeling.cluster_count(),
            noise = labeling.noise_count(),
            min_cluster_size,
            min_samples,
            "clustering finished"
        );
        Ok(labeling)
    }
}

/// Builds the mutual-reachability MST for `points` without clustering.
///
/// Exposed for diagnostics and property tests; the edge list is canonical
/// (`source < target`) and sorted by ascending weight.
#[must_use]
pub fn mutual_reachability_edges(points: &[Vec<f32>], min_samples: usize) -> Vec<MstEdge> {
    let width = points.first().map_or(0, Vec::len);
    let m = points.len();
    if m < 2 {
        return Vec::new();
    }
    let mut data = Vec::with_capacity(m * width);
    for point in points {
        data.extend_from_slice(point);
    }
    let matrix = DistanceMatrix::from_rows(m, width, &data);
    let k = min_samples.max(1).min(m - 1);
    let core = matrix.core_distances(k);
    mutual_reachability_mst(&matrix, &core)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn far_pair_blobs(per_blob: usize) -> Vec<Vec<f32>> {
        let mut points = Vec::new();
        for i in 0..per_blob {
            points.push(vec![0.0 + 0.001 * i as f32, 0.0]);
        }
        for i in 0..per_blob {
            points.push(vec![100.0 + 0.001 * i as f32, 0.0]);
        }
        points
    }

    #[test]
    fn params_cap_shrinks_on_small_corpora() {
        let params = HdbscanParams::try_new(20, 10).expect("positive parameters");
        assert_eq!(params.effective(30), (6, 6));
        assert_eq!(params.effective(200), (20, 10));
        assert_eq!(params.effective(3), (2, 2));
    }

    #[test]
    fn try_new_rejects_non_positive_parameters() {
        let err = HdbscanParams::try_new(0, 5).expect_err("zero must be rejected");
        assert_eq!(err.code().as_str(), "KIJI_INVALID_PARAMETERS");
        let err = HdbscanParams::try_new(5, -3).expect_err("negative must be rejected");
        assert_eq!(err.code().as_str(), "KIJI_INVALID_PARAMETERS");
    }

    #[test]
    fn empty_input_yields_empty_labeling() {
        let clusterer = Hdbscan::default();
        let labeling = clusterer
            .run(&[], &CancelToken::new())
            .expect("empty input is not an error");
        assert!(labeling.is_empty());
        assert_eq!(labeling.cluster_count(), 0);
    }

    #[test]
    fn single_point_is_noise() {
        let clusterer = Hdbscan::default();
        let labeling = clusterer
            .run(&[vec![1.0, 2.0]], &CancelToken::new())
            .expect("single point is not an error");
        assert_eq!(labeling.labels(), &[NOISE]);
        assert_eq!(labeling.membership(0), 0.0);
    }

    #[test]
    fn two_blobs_separate() {
        let clusterer = Hdbscan::new(
            HdbscanParams::try_new(5, 3).expect("positive parameters"),
        );
        let labeling = clusterer
            .run(&far_pair_blobs(20), &CancelToken::new())
            .expect("clustering must succeed");
        assert_eq!(labeling.cluster_count(), 2);
        assert_eq!(labeling.noise_count(), 0);
        let sizes = labeling.cluster_sizes();
        assert_eq!(sizes, vec![20, 20]);
        // The two halves land in different clusters.
        assert_ne!(labeling.labels()[0], labeling.labels()[20]);
    }

    #[test]
    fn identical_points_form_a_single_cluster() {
        let clusterer = Hdbscan::new(
            HdbscanParams::try_new(3, 2).expect("positive parameters"),
        );
        let points = vec![vec![1.0, 1.0]; 12];
        let labeling = clusterer
            .run(&points, &CancelToken::new())
            .expect("clustering must succeed");
        assert_eq!(labeling.cluster_count(), 1);
        assert!(labeling.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn runs_are_deterministic() {
        let clusterer = Hdbscan::new(
            HdbscanParams::try_new(4, 2).expect("positive parameters"),
        );
        let points = far_pair_blobs(10);
        let first = clusterer
            .run(&points, &CancelToken::new())
            .expect("clustering must succeed");
        let second = clusterer
            .run(&points, &CancelToken::new())
            .expect("clustering must succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn cancellation_stops_between_phases() {
        let clusterer = Hdbscan::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = clusterer
            .run(&far_pair_blobs(5), &cancel)
            .expect_err("cancelled token must stop the run");
        assert!(err.is_cancelled());
    }

    #[test]
    fn labels_are_contiguous_with_noise() {
        let clusterer = Hdbscan::new(
            HdbscanParams::try_new(4, 2).expect("positive parameters"),
        );
        let labeling = clusterer
            .run(&far_pair_blobs(12), &CancelToken::new())
            .expect("clustering must succeed");
        for &label in labeling.labels() {
            assert!(label == NOISE || (label >= 0 && (label as usize) < labeling.cluster_count()));
        }
        let clustered: usize = labeling.cluster_sizes().iter().sum();
        assert_eq!(clustered + labeling.noise_count(), labeling.len());
    }
}
