//! Numerical primitives over dense `f32` vectors.
//!
//! These routines are the leaves of the pipeline and are deliberately
//! sentinel-free: degenerate inputs produce zeros (or `None` for the pooled
//! mean) rather than errors. Accumulation happens in `f64` to keep long
//! 768-dimensional sums stable. Equal lengths are a caller contract.

/// Norms below this threshold are treated as zero to avoid NaN blow-ups.
pub const EPS: f32 = 1e-12;

/// Computes the L2 norm of `v`.
#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    let mut sum = 0.0f64;
    for &value in v {
        sum += f64::from(value) * f64::from(value);
    }
    sum.sqrt() as f32
}

/// Scales `v` to unit L2 norm in place.
///
/// Vectors with norm below [`EPS`] are left unchanged so zero blocks stay
/// zero blocks.
///
/// # Examples
/// ```
/// use kiji_core::vecops::normalize_in_place;
///
/// let mut v = [3.0, 4.0];
/// normalize_in_place(&mut v);
/// assert!((v[0] - 0.6).abs() < 1e-6);
/// assert!((v[1] - 0.8).abs() < 1e-6);
/// ```
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm < EPS {
        return;
    }
    for value in v.iter_mut() {
        *value /= norm;
    }
}

/// Returns a unit-norm copy of `v`, or an unchanged copy when `v` is (near) zero.
#[must_use]
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

/// Computes the dot product of `a` and `b`.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f64;
    for (&l, &r) in a.iter().zip(b.iter()) {
        sum += f64::from(l) * f64::from(r);
    }
    sum as f32
}

/// Computes cosine similarity, returning `0.0` when either side is (near) zero.
///
/// # Examples
/// ```
/// use kiji_core::vecops::cosine;
///
/// assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
/// ```
#[must_use]
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a < EPS || norm_b < EPS {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Computes the Euclidean distance via the inner-product identity.
///
/// The radicand is clamped at zero so floating error on near-identical
/// vectors cannot produce NaN.
#[must_use]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut norm_sq = 0.0f64;
    let mut inner = 0.0f64;
    for (&l, &r) in a.iter().zip(b.iter()) {
        norm_sq += f64::from(l) * f64::from(l) + f64::from(r) * f64::from(r);
        inner += f64::from(l) * f64::from(r);
    }
    (norm_sq - 2.0 * inner).max(0.0).sqrt() as f32
}

/// Computes the weighted mean `Σ wᵢvᵢ / Σ wᵢ` over equal-length vectors.
///
/// Returns `None` when `vectors` is empty or the weight mass is not positive.
///
/// # Examples
/// ```
/// use kiji_core::vecops::weighted_mean;
///
/// let pooled = weighted_mean(&[&[2.0, 0.0][..], &[0.0, 2.0][..]], &[1.0, 3.0])
///     .expect("positive weight mass");
/// assert!((pooled[0] - 0.5).abs() < 1e-6);
/// assert!((pooled[1] - 1.5).abs() < 1e-6);
/// ```
#[must_use]
pub fn weighted_mean(vectors: &[&[f32]], weights: &[f32]) -> Option<Vec<f32>> {
    debug_assert_eq!(vectors.len(), weights.len());
    let first = vectors.first()?;
    let mass: f64 = weights.iter().map(|&w| f64::from(w)).sum();
    if mass <= 0.0 {
        return None;
    }

    let mut acc = vec![0.0f64; first.len()];
    for (vector, &weight) in vectors.iter().zip(weights.iter()) {
        debug_assert_eq!(vector.len(), acc.len());
        for (slot, &value) in acc.iter_mut().zip(vector.iter()) {
            *slot += f64::from(weight) * f64::from(value);
        }
    }

    Some(acc.into_iter().map(|value| (value / mass) as f32).collect())
}

/// Adds `rhs` into `lhs` element-wise.
pub fn add_assign(lhs: &mut [f32], rhs: &[f32]) {
    debug_assert_eq!(lhs.len(), rhs.len());
    for (slot, &value) in lhs.iter_mut().zip(rhs.iter()) {
        *slot += value;
    }
}

/// Scales every element of `v` by `factor`.
pub fn scale(v: &mut [f32], factor: f32) {
    for value in v.iter_mut() {
        *value *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn normalize_is_idempotent() {
        let mut v = vec![1.0, -2.0, 2.0];
        normalize_in_place(&mut v);
        let once = v.clone();
        normalize_in_place(&mut v);
        for (a, b) in once.iter().zip(v.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn normalize_leaves_zero_vectors_alone() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[rstest]
    #[case(&[1.0, 0.0], &[0.0, 1.0], 0.0)]
    #[case(&[1.0, 0.0], &[-1.0, 0.0], -1.0)]
    #[case(&[2.0, 0.0], &[5.0, 0.0], 1.0)]
    fn cosine_matches_geometry(#[case] a: &[f32], #[case] b: &[f32], #[case] expected: f32) {
        assert!((cosine(a, b) - expected).abs() < 1e-6);
    }

    #[test]
    fn euclidean_is_zero_for_identical_vectors() {
        let v = [0.3f32, -0.7, 0.64];
        assert_eq!(euclidean(&v, &v), 0.0);
    }

    #[test]
    fn euclidean_matches_direct_formula() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [4.0f32, 6.0, 8.0];
        assert!((euclidean(&a, &b) - 7.071_068).abs() < 1e-5);
    }

    #[test]
    fn weighted_mean_rejects_zero_mass() {
        let v: &[f32] = &[1.0, 1.0];
        assert!(weighted_mean(&[v], &[0.0]).is_none());
        assert!(weighted_mean(&[], &[]).is_none());
    }
}
