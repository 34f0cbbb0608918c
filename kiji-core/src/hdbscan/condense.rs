//! Condensed-tree construction from the single-linkage dendrogram.
//!
//! Merges are walked in recorded (non-decreasing distance) order with
//! `λ = 1/distance` (infinite at zero distance). A merge is a real split
//! only when both children reach `min_cluster_size`; every other merge
//! continues the surviving condensed identity and sheds the smaller child
//! as a fall-out. Persistent identity is the load-bearing subtlety here:
//! fall-outs must accumulate against the id the cluster has carried across
//! merges, otherwise stability attribution in the selection phase is wrong.

use super::dendrogram::Dendrogram;

/// A smaller child shed at a non-split merge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Fallout {
    /// Condensed cluster the points fell out of.
    pub(super) parent: usize,
    /// λ at the shedding merge.
    pub(super) lambda: f32,
    /// Dendrogram node whose leaves are the shed points.
    pub(super) node: usize,
    /// Number of shed points.
    pub(super) size: usize,
}

/// One condensed cluster and its stability bookkeeping.
#[derive(Clone, Debug)]
pub(super) struct CondensedCluster {
    pub(super) parent: Option<usize>,
    pub(super) children: Vec<usize>,
    /// λ at which the cluster was created by the split above it; roots keep 0.
    pub(super) birth_lambda: f32,
    /// Dendrogram node whose leaf descendants are the cluster's points.
    pub(super) dendro_node: usize,
    /// λ at which the carried subtree first reached `min_cluster_size`.
    pub(super) maturity_lambda: Option<f32>,
    /// Σ λ·size over fall-out and child-registration records.
    sum_lambda_size: f64,
    /// Σ size over the same records.
    sum_size: f64,
    /// Identity terminated by absorption into a surviving sibling.
    pub(super) absorbed: bool,
}

impl CondensedCluster {
    fn new(dendro_node: usize) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            birth_lambda: 0.0,
            dendro_node,
            maturity_lambda: None,
            sum_lambda_size: 0.0,
            sum_size: 0.0,
            absorbed: false,
        }
    }

    fn accumulate(&mut self, lambda: f32, size: usize) {
        self.sum_lambda_size += f64::from(lambda) * size as f64;
        self.sum_size += size as f64;
    }

    /// Finalises `Σ (λ_p − birth) · size`, clamped non-negative.
    ///
    /// Zero-distance merges produce infinite λ on both sides of the
    /// subtraction; the NaN that falls out of `∞ − ∞` is clamped to zero so
    /// the all-points-identical corpus degrades to the root fallback.
    pub(super) fn stability(&self) -> f32 {
        let raw = self.sum_lambda_size - f64::from(self.birth_lambda) * self.sum_size;
        if raw.is_nan() { 0.0 } else { raw.max(0.0) as f32 }
    }
}

/// The condensed hierarchy for one build.
#[derive(Clone, Debug, Default)]
pub(super) struct CondensedTree {
    pub(super) clusters: Vec<CondensedCluster>,
    pub(super) fallouts: Vec<Fallout>,
    /// Identity carried to the top of the dendrogram, if any merge happened.
    pub(super) root: Option<usize>,
}

impl CondensedTree {
    /// Walks dendrogram merges in order and condenses them.
    pub(super) fn from_dendrogram(dendrogram: &Dendrogram, min_cluster_size: usize) -> Self {
        let node_count = dendrogram.point_count + dendrogram.merges.len();
        let mut carried: Vec<Option<usize>> = vec![None; node_count];
        let mut tree = Self::default();

        for merge in &dendrogram.merges {
            let lambda = if merge.distance > 0.0 {
                1.0 / merge.distance
            } else {
                f32::INFINITY
            };
            let left_size = dendrogram.size_of(merge.left);
            let right_size = dendrogram.size_of(merge.right);

            let carried_id = if left_size >= min_cluster_size && right_size >= min_cluster_size {
                tree.real_split(
                    merge.id,
                    lambda,
                    &carried,
                    (merge.left, left_size),
                    (merge.right, right_size),
                )
            } else {
                // The larger child keeps the surviving condensed identity;
                // ties keep the left child.
                let (survivor, falling, falling_size) = if left_size >= right_size {
                    (merge.left, merge.right, right_size)
                } else {
                    (merge.right, merge.left, left_size)
                };
                tree.continue_identity(merge.id, lambda, &carried, survivor, falling, falling_size)
            };

            if merge.size >= min_cluster_size {
                let cluster = &mut tree.clusters[carried_id];
                if cluster.maturity_lambda.is_none() {
                    cluster.maturity_lambda = Some(lambda);
                }
            }
            carried[merge.id] = Some(carried_id);
            tree.root = Some(carried_id);
        }

        tree
    }

    fn alloc(&mut self, dendro_node: usize) -> usize {
        let id = self.clusters.len();
        self.clusters.push(CondensedCluster::new(dendro_node));
        id
    }

    /// Emits both children as condensed clusters under a fresh parent.
    fn real_split(
        &mut self,
        merge_node: usize,
        lambda: f32,
        carried: &[Option<usize>],
        left: (usize, usize),
        right: (usize, usize),
    ) -> usize {
        let parent = self.alloc(merge_node);
        for (child_node, child_size) in [left, right] {
            let child = carried[child_node]
                .expect("a subtree at min_cluster_size always carries an identity");
            let cluster = &mut self.clusters[child];
            cluster.parent = Some(parent);
            cluster.birth_lambda = lambda;
            cluster.dendro_node = child_node;
            self.clusters[parent].children.push(child);
            // Registration: the parent's mass leaves into this child here.
            self.clusters[parent].accumulate(lambda, child_size);
        }
        parent
    }

    /// Carries the surviving identity across a non-split merge.
    fn continue_identity(
        &mut self,
        merge_node: usize,
        lambda: f32,
        carried: &[Option<usize>],
        survivor: usize,
        falling: usize,
        falling_size: usize,
    ) -> usize {
        let id = match (carried[survivor], carried[falling]) {
            (Some(existing), other) => {
                if let Some(absorbed) = other
                    && absorbed != existing
                {
                    self.clusters[absorbed].absorbed = true;
                }
                existing
            }
            (None, Some(takeover)) => takeover,
            (None, None) => self.alloc(merge_node),
        };
        self.clusters[id].dendro_node = merge_node;
        self.clusters[id].accumulate(lambda, falling_size);
        self.fallouts.push(Fallout {
            parent: id,
            lambda,
            node: falling,
            size: falling_size,
        });
        id
    }
}
