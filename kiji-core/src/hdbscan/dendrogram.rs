//! Single-linkage dendrogram construction.
//!
//! MST edges are replayed in non-decreasing weight order through a
//! union-find; every union allocates a fresh internal cluster id at or above
//! the point count, producing the classic merge-record dendrogram. The
//! leaf-descendant walk is iterative with an explicit stack: single-linkage
//! dendrograms can reach depth `M`, which overflows recursive walks on
//! realistic corpora.

use super::mst::MstEdge;

/// One dendrogram merge: `left` and `right` are prior cluster ids (a point
/// id below the point count, or an earlier merge id at or above it).
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Merge {
    pub(super) left: usize,
    pub(super) right: usize,
    pub(super) distance: f32,
    pub(super) size: usize,
    pub(super) id: usize,
}

/// The merge-record dendrogram over one build's points.
#[derive(Clone, Debug, Default)]
pub(super) struct Dendrogram {
    pub(super) point_count: usize,
    pub(super) merges: Vec<Merge>,
}

impl Dendrogram {
    /// Returns the merge record backing internal node `id`.
    pub(super) fn merge_of(&self, id: usize) -> Option<&Merge> {
        id.checked_sub(self.point_count)
            .and_then(|offset| self.merges.get(offset))
    }

    /// Returns the number of points under `id`.
    pub(super) fn size_of(&self, id: usize) -> usize {
        if id < self.point_count {
            1
        } else {
            self.merge_of(id).map_or(0, |merge| merge.size)
        }
    }

    /// Collects the point ids under `id` with an explicit stack.
    pub(super) fn leaf_descendants(&self, id: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        self.visit_leaves(id, |point| leaves.push(point));
        leaves.sort_unstable();
        leaves
    }

    /// Visits every point id under `id` without recursion.
    pub(super) fn visit_leaves(&self, id: usize, mut visit: impl FnMut(usize)) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if current < self.point_count {
                visit(current);
                continue;
            }
            if let Some(merge) = self.merge_of(current) {
                stack.push(merge.left);
                stack.push(merge.right);
            }
        }
    }
}

/// Union-find with path compression and union by rank.
///
/// `cluster_of` tracks, per component root, the dendrogram id currently
/// representing that component.
#[derive(Clone, Debug)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    cluster_of: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            cluster_of: (0..n).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[node] != node {
            let parent = self.parent[node];
            self.parent[node] = root;
            node = parent;
        }

        root
    }

    fn union(&mut self, left: usize, right: usize) -> usize {
        let mut left = self.find(left);
        let mut right = self.find(right);
        debug_assert_ne!(left, right);
        let left_rank = self.rank[left];
        let right_rank = self.rank[right];
        if left_rank < right_rank {
            std::mem::swap(&mut left, &mut right);
        }
        self.parent[right] = left;
        if left_rank == right_rank {
            self.rank[left] = left_rank.saturating_add(1);
        }
        left
    }
}

/// Replays sorted MST edges into merge records.
pub(super) fn build_dendrogram(point_count: usize, edges: &[MstEdge]) -> Dendrogram {
    let mut sets = DisjointSet::new(point_count);
    let mut merges = Vec::with_capacity(edges.len());
    let mut next_id = point_count;

    for edge in edges {
        let left_root = sets.find(edge.source());
        let right_root = sets.find(edge.target());
        if left_root == right_root {
            // MST edges never close a cycle; tolerate malformed input anyway.
            continue;
        }
        let left = sets.cluster_of[left_root];
        let right = sets.cluster_of[right_root];
        let size = sets_size(&merges, point_count, left) + sets_size(&merges, point_count, right);
        let merged_root = sets.union(left_root, right_root);
        sets.cluster_of[merged_root] = next_id;
        merges.push(Merge {
            left,
            right,
            distance: edge.weight(),
            size,
            id: next_id,
        });
        next_id += 1;
    }

    Dendrogram {
        point_count,
        merges,
    }
}

fn sets_size(merges: &[Merge], point_count: usize, id: usize) -> usize {
    if id < point_count {
        1
    } else {
        merges[id - point_count].size
    }
}
