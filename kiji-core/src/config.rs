//! Explicit configuration records for the analytics core.
//!
//! The core holds no global state: everything tunable arrives as a context
//! record on component construction. Embedding dimension is a process-wide
//! constant for one deployment, so it lives here rather than on each call.

use std::num::NonZeroUsize;

use crate::relation::FAMILY_COUNT;

/// Default embedding dimension used by the bundled extraction models.
pub const DEFAULT_DIMENSION: usize = 768;

/// Default IDF cap.
pub const DEFAULT_IDF_MAX: f32 = 6.0;

/// Default vectorizer batch size; a memory tuning knob, not a correctness one.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Shared configuration for the vectorizer and downstream consumers.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use kiji_core::CoreContext;
///
/// let ctx = CoreContext::new(NonZeroUsize::new(4).expect("literal 4 is non-zero"));
/// assert_eq!(ctx.dimension().get(), 4);
/// assert_eq!(ctx.event_vector_width(), 3 * 4 + 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreContext {
    dimension: NonZeroUsize,
    idf_max: f32,
    batch_size: NonZeroUsize,
}

impl Default for CoreContext {
    fn default() -> Self {
        Self {
            dimension: NonZeroUsize::new(DEFAULT_DIMENSION).expect("default dimension is non-zero"),
            idf_max: DEFAULT_IDF_MAX,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE)
                .expect("default batch size is non-zero"),
        }
    }
}

impl CoreContext {
    /// Creates a context for the given embedding dimension with defaults.
    #[must_use]
    pub fn new(dimension: NonZeroUsize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    /// Overrides the IDF cap. Values at or below zero fall back to the default.
    #[must_use]
    pub fn with_idf_max(mut self, idf_max: f32) -> Self {
        if idf_max > 0.0 {
            self.idf_max = idf_max;
        }
        self
    }

    /// Overrides the vectorizer batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Returns the embedding dimension `D`.
    #[must_use]
    pub fn dimension(&self) -> NonZeroUsize {
        self.dimension
    }

    /// Returns the IDF cap.
    #[must_use]
    pub fn idf_max(&self) -> f32 {
        self.idf_max
    }

    /// Returns the vectorizer batch size.
    #[must_use]
    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Returns the event-vector width `3·D + F`.
    #[must_use]
    pub fn event_vector_width(&self) -> usize {
        3 * self.dimension.get() + FAMILY_COUNT
    }
}
