//! Error types for the kiji core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::{error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

/// Pipeline stages referenced by cancellation and persistence diagnostics.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Stage {
    /// Document-frequency and IDF computation.
    Idf,
    /// Event-vector pooling and normalisation.
    Vectorize,
    /// Pairwise distances and core distances.
    CoreDistances,
    /// Minimum spanning tree over mutual reachability.
    Mst,
    /// Single-linkage dendrogram construction.
    Dendrogram,
    /// Condensed-tree construction.
    Condense,
    /// Excess-of-Mass selection and label assignment.
    Select,
    /// Centroid, exemplar, and top-entity aggregation.
    Artifacts,
    /// Writing results to the persistence sink.
    Persist,
}

impl Stage {
    /// Return the stable machine-readable name of this stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idf => "idf",
            Self::Vectorize => "vectorize",
            Self::CoreDistances => "core_distances",
            Self::Mst => "mst",
            Self::Dendrogram => "dendrogram",
            Self::Condense => "condense",
            Self::Select => "select",
            Self::Artifacts => "artifacts",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four persisted relations, in required write order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PersistRelation {
    /// Per-event cluster assignments.
    Assignments,
    /// Cluster summaries (centroid, label, size, top entities and families).
    Clusters,
    /// Cluster membership rows.
    Members,
    /// Ranked exemplar rows.
    Exemplars,
}

impl PersistRelation {
    /// Return the stable machine-readable name of this relation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assignments => "assignments",
            Self::Clusters => "clusters",
            Self::Members => "members",
            Self::Exemplars => "exemplars",
        }
    }
}

impl fmt::Display for PersistRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable codes describing [`CoreError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CoreErrorCode {
    /// The embedding source contained no vectors.
    NoEmbeddings,
    /// No event vectors were built, so clustering cannot run.
    NoEvents,
    /// A caller-supplied parameter was out of range.
    InvalidParameters,
    /// A stored embedding did not match the configured dimension.
    DimensionMismatch,
    /// The run was cancelled cooperatively.
    Cancelled,
    /// The persistence sink reported a failure.
    PersistenceFailure,
}

impl CoreErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoEmbeddings => "KIJI_NO_EMBEDDINGS",
            Self::NoEvents => "KIJI_NO_EVENTS",
            Self::InvalidParameters => "KIJI_INVALID_PARAMETERS",
            Self::DimensionMismatch => "KIJI_DIMENSION_MISMATCH",
            Self::Cancelled => "KIJI_CANCELLED",
            Self::PersistenceFailure => "KIJI_PERSISTENCE_FAILURE",
        }
    }
}

impl fmt::Display for CoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type produced by the analytics pipeline and its components.
#[non_exhaustive]
#[derive(Clone, Debug, Error)]
pub enum CoreError {
    /// The embedding source contained no vectors; the vectorizer refuses to run.
    #[error("embedding source `{source_name}` contains no vectors")]
    NoEmbeddings {
        /// Name of the offending embedding source.
        source_name: Arc<str>,
    },
    /// No event vectors were built; the clusterer refuses to run.
    #[error("no event vectors were produced for build {build_id}")]
    NoEvents {
        /// Identifier of the pipeline run.
        build_id: u64,
    },
    /// A caller-supplied parameter was out of range.
    #[error("{what} must be positive (got {got})")]
    InvalidParameters {
        /// Name of the offending parameter.
        what: &'static str,
        /// Value supplied by the caller.
        got: i64,
    },
    /// A stored embedding did not match the configured dimension.
    ///
    /// The vectorizer skips such vectors with a diagnostic; this variant
    /// exists so collaborators can surface the same condition as an error.
    #[error("embedding for `{label}` has dimension {got} but {expected} was configured")]
    DimensionMismatch {
        /// Node label whose embedding was rejected.
        label: Arc<str>,
        /// Configured embedding dimension.
        expected: usize,
        /// Observed vector length.
        got: usize,
    },
    /// The run was cancelled at a cooperative checkpoint.
    ///
    /// Callers must treat this as non-error termination.
    #[error("run cancelled during {stage}")]
    Cancelled {
        /// Stage that observed the cancellation.
        stage: Stage,
    },
    /// The persistence sink failed while a relation was being written.
    #[error("persistence sink failed while writing {relation}: {source}")]
    Persistence {
        /// Relation that was being written when the sink failed.
        relation: PersistRelation,
        /// Error surfaced unmodified from the sink.
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
}

impl CoreError {
    /// Retrieve the stable [`CoreErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> CoreErrorCode {
        match self {
            Self::NoEmbeddings { .. } => CoreErrorCode::NoEmbeddings,
            Self::NoEvents { .. } => CoreErrorCode::NoEvents,
            Self::InvalidParameters { .. } => CoreErrorCode::InvalidParameters,
            Self::DimensionMismatch { .. } => CoreErrorCode::DimensionMismatch,
            Self::Cancelled { .. } => CoreErrorCode::Cancelled,
            Self::Persistence { .. } => CoreErrorCode::PersistenceFailure,
        }
    }

    /// Whether this error represents cooperative cancellation rather than failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, CoreError>;
