//! Shared helpers for unit tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::vectorizer::{EmbeddingMap, EmbeddingSource};

/// Embedding source that counts lookups, for asserting pooling behaviour.
pub(crate) struct CountingEmbeddings {
    inner: EmbeddingMap,
    lookups: Arc<AtomicUsize>,
}

impl CountingEmbeddings {
    pub(crate) fn new(inner: EmbeddingMap, lookups: Arc<AtomicUsize>) -> Self {
        Self { inner, lookups }
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl EmbeddingSource for CountingEmbeddings {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn embedding(&self, label: &str) -> Option<&[f32]> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.inner.embedding(label)
    }
}
