//! Kiji core library.
//!
//! The knowledge-graph analytics core of a personal news-analysis system:
//! extracted Subject–Verb–Object triples plus node embeddings go in, and
//! out come dense event vectors, density-based story themes, multi-hop
//! reasoning paths, and a force-directed layout for the interactive view.
//!
//! The pipeline is batch over a fixed snapshot: `HypergraphIndex` →
//! `EventVectorizer` → `Hdbscan` → cluster artifacts → persistence, with
//! the path finder and layout reading the shared index independently.

mod artifacts;
mod cancel;
mod config;
mod error;
mod hdbscan;
mod hypergraph;
mod layout;
mod memory;
mod pathfinder;
mod persist;
mod pipeline;
mod relation;
pub mod vecops;
mod vectorizer;
pub mod wire;

pub use crate::{
    artifacts::{
        ClusterSummary, Exemplar, MAX_EXEMPLARS, MAX_TOP_ENTITIES, MAX_TOP_FAMILIES, TopEntity,
        TopFamily, build_cluster_summaries,
    },
    cancel::CancelToken,
    config::{CoreContext, DEFAULT_BATCH_SIZE, DEFAULT_DIMENSION, DEFAULT_IDF_MAX},
    error::{CoreError, CoreErrorCode, PersistRelation, Result, Stage},
    hdbscan::{Hdbscan, HdbscanParams, Labeling, MstEdge, NOISE, mutual_reachability_edges},
    hypergraph::{
        EdgeId, HypergraphBuilder, HypergraphError, HypergraphIndex, Incidence, NodeId, Role,
        Triple,
    },
    layout::{ForceDirectedLayout, LayoutTunables, Vec2},
    memory::{estimate_peak_bytes, format_bytes},
    pathfinder::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS, PathFinder, PathQuery, ReasoningPath},
    persist::{
        AssignmentRecord, BuildId, ClusterRecord, ExemplarRecord, LabelProvider, MemberRecord,
        MemorySink, PersistenceSink, SinkError,
    },
    pipeline::{Pipeline, PipelineBuilder, PipelineReport},
    relation::{FAMILY_COUNT, RelationFamily},
    vectorizer::{EmbeddingMap, EmbeddingSource, EventVectorizer, EventVectors, IdfTable},
    wire::WireError,
};

#[cfg(test)]
pub(crate) mod test_utils;
