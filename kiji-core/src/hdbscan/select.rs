//! Excess-of-Mass selection and flat label assignment.
//!
//! Clusters are selected bottom-up: a parent wins over its children exactly
//! when its stability matches or exceeds their propagated sum. Every walk
//! over dendrogram leaves uses an explicit stack; single-linkage trees reach
//! depth `M` and recursion is not an option at realistic corpus sizes.

use super::{
    condense::CondensedTree,
    dendrogram::Dendrogram,
};

/// Label reserved for noise across every interface carrying cluster ids.
pub const NOISE: i64 = -1;

/// Flat labels for one clustering run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct FlatLabels {
    pub(super) labels: Vec<i64>,
    pub(super) cluster_count: usize,
}

/// Selects condensed clusters by Excess of Mass.
///
/// Returns selected ids in ascending order. Absorbed identities never
/// participate; when nothing survives selection the root is chosen as a
/// fallback so a well-formed corpus cannot come back all-noise.
fn select_clusters(tree: &CondensedTree) -> Vec<usize> {
    let count = tree.clusters.len();
    let mut selected = vec![false; count];
    let mut propagated = vec![0.0f32; count];

    // Parent ids are always allocated after their children, so ascending id
    // order is a bottom-up traversal.
    for id in 0..count {
        let cluster = &tree.clusters[id];
        if cluster.absorbed {
            continue;
        }
        if cluster.children.is_empty() {
            selected[id] = true;
            propagated[id] = cluster.stability();
            continue;
        }

        let child_sum: f32 = cluster
            .children
            .iter()
            .map(|&child| propagated[child])
            .sum();
        let stability = cluster.stability();
        if stability >= child_sum {
            selected[id] = true;
            propagated[id] = stability;
            deselect_descendants(tree, id, &mut selected);
        } else {
            propagated[id] = child_sum;
        }
    }

    let mut chosen: Vec<usize> = (0..count).filter(|&id| selected[id]).collect();
    if chosen.is_empty()
        && let Some(root) = tree.root
    {
        chosen.push(root);
    }
    chosen
}

fn deselect_descendants(tree: &CondensedTree, id: usize, selected: &mut [bool]) {
    let mut stack: Vec<usize> = tree.clusters[id].children.clone();
    while let Some(current) = stack.pop() {
        selected[current] = false;
        stack.extend(tree.clusters[current].children.iter().copied());
    }
}

/// Assigns flat labels `0..K-1` (ascending selected-id order) plus noise.
pub(super) fn extract_labels(tree: &CondensedTree, dendrogram: &Dendrogram) -> FlatLabels {
    let point_count = dendrogram.point_count;
    let mut labels = vec![NOISE; point_count];

    let Some(root) = tree.root else {
        // No merges happened: zero or one point, all noise.
        return FlatLabels {
            labels,
            cluster_count: 0,
        };
    };

    let chosen = select_clusters(tree);
    for (label, &id) in chosen.iter().enumerate() {
        let cluster = &tree.clusters[id];
        let is_lone_root = id == root && cluster.children.is_empty();
        if is_lone_root {
            label_root_members(tree, dendrogram, id, label as i64, &mut labels);
        } else {
            dendrogram.visit_leaves(cluster.dendro_node, |point| {
                labels[point] = label as i64;
            });
        }
    }

    FlatLabels {
        labels,
        cluster_count: chosen.len(),
    }
}

/// Membership for the single-cluster corpus.
///
/// When no real split ever happened the root identity spans every point,
/// and labelling its whole dendrogram subtree would swallow spur points
/// that only attached at coarse distances. Membership is therefore gated on
/// join density: a point belongs when the λ at which its subtree joined the
/// carried identity is at least the λ at which that identity reached
/// `min_cluster_size`. Spine points that never fell out always belong.
fn label_root_members(
    tree: &CondensedTree,
    dendrogram: &Dendrogram,
    root: usize,
    label: i64,
    labels: &mut [i64],
) {
    let threshold = tree.clusters[root].maturity_lambda.unwrap_or(0.0);
    let mut join = vec![f32::INFINITY; dendrogram.point_count];
    for fallout in tree.fallouts.iter().filter(|f| f.parent == root) {
        dendrogram.visit_leaves(fallout.node, |point| {
            join[point] = fallout.lambda;
        });
    }
    for (point, &lambda) in join.iter().enumerate() {
        if lambda >= threshold {
            labels[point] = label;
        }
    }
}
