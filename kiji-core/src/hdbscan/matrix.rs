//! Pairwise distances and core distances.
//!
//! The clusterer operates on the full Euclidean distance matrix. Rows are
//! filled in parallel with Rayon; everything downstream of this phase is
//! sequential and deterministic.

use rayon::prelude::*;

use crate::vecops;

/// Dense symmetric distance matrix over `m` points.
#[derive(Debug, Clone)]
pub(super) struct DistanceMatrix {
    m: usize,
    data: Vec<f32>,
}

impl DistanceMatrix {
    /// Computes all pairwise Euclidean distances for row-major `points`.
    pub(super) fn from_rows(m: usize, width: usize, points: &[f32]) -> Self {
        debug_assert_eq!(points.len(), m * width);
        let mut data = vec![0.0f32; m * m];
        data.par_chunks_mut(m).enumerate().for_each(|(i, row)| {
            let a = &points[i * width..(i + 1) * width];
            for (j, slot) in row.iter_mut().enumerate() {
                if i == j {
                    continue;
                }
                let b = &points[j * width..(j + 1) * width];
                *slot = vecops::euclidean(a, b);
            }
        });
        Self { m, data }
    }

    /// Returns the number of points.
    #[rustfmt::skip]
    pub(super) fn len(&self) -> usize { self.m }

    /// Returns the distance between points `i` and `j`.
    #[inline]
    pub(super) fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.m + j]
    }

    /// Computes the core distance of every point.
    ///
    /// `k` is a 0-based index into each point's sorted distance list
    /// including self, so `k = 0` yields the self distance of zero. Ties are
    /// broken by point index for determinism.
    pub(super) fn core_distances(&self, k: usize) -> Vec<f32> {
        debug_assert!(k < self.m.max(1));
        (0..self.m)
            .map(|i| {
                let mut sorted: Vec<(f32, usize)> =
                    (0..self.m).map(|j| (self.get(i, j), j)).collect();
                sorted.sort_unstable_by(|a, b| {
                    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1))
                });
                sorted[k].0
            })
            .collect()
    }
}
