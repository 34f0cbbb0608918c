//! Pre-flight memory estimation for the clustering pipeline.
//!
//! Provides a conservative estimate of peak memory consumption so callers
//! can reject oversized corpora before any allocation occurs. The estimate
//! is intentionally pessimistic; a safety multiplier covers heap
//! fragmentation, Rayon thread-local buffers, and transient allocations
//! that are difficult to predict statically.

/// Safety multiplier (3/2 = 1.5×) applied to the raw estimate.
const SAFETY_MULTIPLIER_NUMERATOR: u64 = 3;
const SAFETY_MULTIPLIER_DENOMINATOR: u64 = 2;

/// Size of an `f32` — event vectors, distances, and core distances.
const F32_BYTES: u64 = 4;

/// Size of one dendrogram merge record (`left`, `right`, `distance`, `size`,
/// `id`) including padding on 64-bit platforms.
const MERGE_BYTES: u64 = 40;

/// Returns a conservative estimate of peak memory (in bytes) for clustering
/// `event_count` vectors of `width` floats.
///
/// The full pairwise distance matrix dominates: it is quadratic in the
/// event count and is the reason corpora are bounded upstream.
///
/// # Examples
/// ```
/// use kiji_core::estimate_peak_bytes;
///
/// let bytes = estimate_peak_bytes(1_000, 2_313);
/// assert!(bytes > 0, "estimate must be positive for non-empty corpora");
/// assert_eq!(estimate_peak_bytes(0, 2_313), 0);
/// ```
#[must_use]
pub fn estimate_peak_bytes(event_count: usize, width: usize) -> u64 {
    if event_count == 0 {
        return 0;
    }

    let m = event_count as u64;
    let w = width as u64;

    // Row-major event matrix.
    let vectors = m.saturating_mul(w).saturating_mul(F32_BYTES);

    // Full pairwise distance matrix.
    let matrix = m.saturating_mul(m).saturating_mul(F32_BYTES);

    // Core distances plus the per-row sort scratch.
    let core = m.saturating_mul(F32_BYTES).saturating_mul(3);

    // Dendrogram merges and condensed bookkeeping.
    let hierarchy = m.saturating_mul(MERGE_BYTES).saturating_mul(2);

    let subtotal = vectors
        .saturating_add(matrix)
        .saturating_add(core)
        .saturating_add(hierarchy);

    subtotal
        .saturating_mul(SAFETY_MULTIPLIER_NUMERATOR)
        .saturating_div(SAFETY_MULTIPLIER_DENOMINATOR)
}

/// Formats a byte count as a human-readable string using binary units.
///
/// # Examples
/// ```
/// use kiji_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1_073_741_824), "1.0 GiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
