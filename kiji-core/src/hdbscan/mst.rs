//! Minimum spanning tree over the mutual-reachability graph.
//!
//! Mutual reachability blends the pairwise distance with both endpoints'
//! core distances, `mr(i, j) = max(core(i), core(j), dist(i, j))`, which is
//! what makes the downstream hierarchy robust to density. The graph is
//! complete, so Prim's algorithm from vertex 0 is the natural fit: no edge
//! list materialisation, `O(M²)` time, and simple deterministic tie-breaks
//! on the smaller vertex index.

use std::cmp::Ordering;

use super::matrix::DistanceMatrix;

/// A single MST edge in canonical undirected form (`source < target`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MstEdge {
    source: usize,
    target: usize,
    weight: f32,
}

impl MstEdge {
    /// Returns the smaller endpoint id.
    #[rustfmt::skip]
    #[must_use]
    pub fn source(&self) -> usize { self.source }

    /// Returns the larger endpoint id.
    #[rustfmt::skip]
    #[must_use]
    pub fn target(&self) -> usize { self.target }

    /// Returns the mutual-reachability weight.
    #[rustfmt::skip]
    #[must_use]
    pub fn weight(&self) -> f32 { self.weight }
}

impl Eq for MstEdge {}

impl Ord for MstEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl PartialOrd for MstEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn mutual_reachability(matrix: &DistanceMatrix, core: &[f32], i: usize, j: usize) -> f32 {
    matrix.get(i, j).max(core[i]).max(core[j])
}

/// Builds the mutual-reachability MST with Prim's algorithm from vertex 0.
///
/// Returns `m - 1` canonical edges sorted by ascending weight; ties resolve
/// to the smaller vertex index both when picking the next vertex and when
/// recording a cheaper attachment.
pub(super) fn mutual_reachability_mst(matrix: &DistanceMatrix, core: &[f32]) -> Vec<MstEdge> {
    let m = matrix.len();
    if m < 2 {
        return Vec::new();
    }

    let mut in_tree = vec![false; m];
    let mut best_weight = vec![f32::INFINITY; m];
    let mut best_parent = vec![0usize; m];
    in_tree[0] = true;
    for j in 1..m {
        best_weight[j] = mutual_reachability(matrix, core, 0, j);
    }

    let mut edges = Vec::with_capacity(m - 1);
    for _ in 1..m {
        let mut next = usize::MAX;
        let mut next_weight = f32::INFINITY;
        for j in 0..m {
            if !in_tree[j] && best_weight[j] < next_weight {
                next = j;
                next_weight = best_weight[j];
            }
        }
        debug_assert_ne!(next, usize::MAX);

        let parent = best_parent[next];
        let (source, target) = if parent < next {
            (parent, next)
        } else {
            (next, parent)
        };
        edges.push(MstEdge {
            source,
            target,
            weight: next_weight,
        });
        in_tree[next] = true;

        for j in 0..m {
            if in_tree[j] {
                continue;
            }
            let weight = mutual_reachability(matrix, core, next, j);
            let better = weight < best_weight[j]
                || (weight == best_weight[j] && next < best_parent[j]);
            if better {
                best_weight[j] = weight;
                best_parent[j] = next;
            }
        }
    }

    edges.sort_unstable();
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_for(points: &[f32], width: usize) -> DistanceMatrix {
        DistanceMatrix::from_rows(points.len() / width, width, points)
    }

    #[test]
    fn chain_mst_follows_the_line() {
        // Points at 0, 1, 2, 10 on a line: the MST is the chain.
        let matrix = matrix_for(&[0.0, 1.0, 2.0, 10.0], 1);
        let core = vec![0.0; 4];
        let edges = mutual_reachability_mst(&matrix, &core);
        assert_eq!(edges.len(), 3);
        let pairs: Vec<(usize, usize)> = edges.iter().map(|e| (e.source(), e.target())).collect();
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(1, 2)));
        assert!(pairs.contains(&(2, 3)));
    }

    #[test]
    fn weights_are_non_decreasing() {
        let matrix = matrix_for(&[0.0, 3.0, 4.0, 9.5, 10.0, 11.0], 1);
        let core = matrix.core_distances(1);
        let edges = mutual_reachability_mst(&matrix, &core);
        assert_eq!(edges.len(), 5);
        for pair in edges.windows(2) {
            assert!(pair[0].weight() <= pair[1].weight());
        }
        for edge in &edges {
            assert!(edge.source() < edge.target());
        }
    }

    #[test]
    fn core_distances_dominate_close_pairs() {
        // Two points nearly touching, one far: with k = 2 the core distance
        // of every point reaches the far point, inflating all weights.
        let matrix = matrix_for(&[0.0, 0.1, 5.0], 1);
        let core = matrix.core_distances(2);
        let edges = mutual_reachability_mst(&matrix, &core);
        assert_eq!(edges.len(), 2);
        for edge in &edges {
            assert!(edge.weight() >= 4.9);
        }
    }

    #[test]
    fn single_point_has_no_edges() {
        let matrix = matrix_for(&[0.5], 1);
        assert!(mutual_reachability_mst(&matrix, &[0.0]).is_empty());
    }
}
