//! Batch pipeline orchestration for one build.
//!
//! Data flows linearly per run: hypergraph → IDF → event vectors → HDBSCAN →
//! cluster artifacts → persistence. Exactly one run is in flight per
//! [`BuildId`]; collaborators enforce mutual exclusion at the run level, so
//! the pipeline itself holds no locks. All results are buffered and flushed
//! in relation order only after every phase has completed — a cancelled run
//! leaves the sink untouched.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    artifacts::{ClusterSummary, build_cluster_summaries},
    cancel::CancelToken,
    config::CoreContext,
    error::{CoreError, PersistRelation, Result, Stage},
    hdbscan::{Hdbscan, HdbscanParams, Labeling, NOISE},
    hypergraph::{HypergraphIndex, Role},
    persist::{
        AssignmentRecord, BuildId, ClusterRecord, ExemplarRecord, LabelProvider, MemberRecord,
        PersistenceSink, SinkError,
    },
    vectorizer::{EmbeddingSource, EventVectorizer, EventVectors},
};

/// Configures and constructs [`Pipeline`] instances.
///
/// # Examples
/// ```
/// use kiji_core::PipelineBuilder;
///
/// let pipeline = PipelineBuilder::new()
///     .with_min_cluster_size(8)
///     .with_min_samples(4)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(pipeline.params().min_cluster_size().get(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    ctx: CoreContext,
    min_cluster_size: i64,
    min_samples: i64,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            ctx: CoreContext::default(),
            min_cluster_size: 5,
            min_samples: 5,
        }
    }
}

impl PipelineBuilder {
    /// Creates a builder populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the shared core context.
    #[must_use]
    pub fn with_context(mut self, ctx: CoreContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Overrides the minimum cluster size.
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: i64) -> Self {
        self.min_cluster_size = size;
        self
    }

    /// Overrides the minimum samples parameter.
    #[must_use]
    pub fn with_min_samples(mut self, samples: i64) -> Self {
        self.min_samples = samples;
        self
    }

    /// Validates the configuration and constructs a [`Pipeline`].
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidParameters`] when either clustering
    /// parameter is zero or negative.
    pub fn build(self) -> Result<Pipeline> {
        let params = HdbscanParams::try_new(self.min_cluster_size, self.min_samples)?;
        Ok(Pipeline {
            ctx: self.ctx,
            vectorizer: EventVectorizer::new(self.ctx),
            clusterer: Hdbscan::new(params),
        })
    }
}

/// Summary of one completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// The run this report belongs to.
    pub build_id: BuildId,
    /// Events that produced vectors.
    pub events_vectorized: usize,
    /// Events skipped because neither side had an embedded participant.
    pub events_skipped: usize,
    /// Embeddings skipped for dimension mismatch.
    pub embeddings_skipped: usize,
    /// Clusters found (noise excluded).
    pub cluster_count: usize,
    /// Noise events.
    pub noise_count: usize,
    /// Post-cap minimum cluster size actually used.
    pub effective_min_cluster_size: usize,
}

/// The batch analytics runtime for one deployment.
#[derive(Debug, Clone)]
pub struct Pipeline {
    ctx: CoreContext,
    vectorizer: EventVectorizer,
    clusterer: Hdbscan,
}

impl Pipeline {
    /// Returns the configured core context.
    #[must_use]
    pub fn context(&self) -> &CoreContext {
        &self.ctx
    }

    /// Returns the configured clustering parameters.
    #[must_use]
    pub fn params(&self) -> &HdbscanParams {
        self.clusterer.params()
    }

    /// Runs the full pipeline for `build` and persists the results.
    ///
    /// # Errors
    /// - [`CoreError::NoEmbeddings`] when the embedding source is empty.
    /// - [`CoreError::NoEvents`] when no edge produced a vector.
    /// - [`CoreError::Cancelled`] at any cooperative checkpoint; nothing is
    ///   written in that case.
    /// - [`CoreError::Persistence`] when the sink fails, naming the relation
    ///   that was being written.
    #[instrument(
        name = "pipeline.run",
        err,
        skip_all,
        fields(build = %build, edges = index.edge_count(), nodes = index.node_count()),
    )]
    pub fn run<E, S>(
        &self,
        build: BuildId,
        index: &HypergraphIndex,
        embeddings: &E,
        sink: &mut S,
        labeller: Option<&dyn LabelProvider>,
        cancel: &CancelToken,
    ) -> Result<PipelineReport>
    where
        E: EmbeddingSource,
        S: PersistenceSink,
    {
        cancel.checkpoint(Stage::Idf)?;
        let idf = self.vectorizer.compute_idf(index);

        let vectors = self.vectorizer.build(index, embeddings, &idf, cancel)?;
        if vectors.is_empty() {
            return Err(CoreError::NoEvents {
                build_id: build.get(),
            });
        }

        let labeling = self.clusterer.run_matrix(
            vectors.len(),
            vectors.width(),
            vectors.matrix(),
            cancel,
        )?;

        let mut summaries =
            build_cluster_summaries(index, &idf, &vectors, &labeling, cancel)?;
        if let Some(provider) = labeller {
            relabel(index, &mut summaries, provider);
        }

        cancel.checkpoint(Stage::Persist)?;
        persist(build, sink, &vectors, &labeling, &summaries)?;

        let report = PipelineReport {
            build_id: build,
            events_vectorized: vectors.len(),
            events_skipped: vectors.skipped_unembedded(),
            embeddings_skipped: vectors.skipped_dimension(),
            cluster_count: labeling.cluster_count(),
            noise_count: labeling.noise_count(),
            effective_min_cluster_size: labeling.effective_min_cluster_size(),
        };
        info!(
            clusters = report.cluster_count,
            noise = report.noise_count,
            vectorized = report.events_vectorized,
            "pipeline run complete"
        );
        Ok(report)
    }
}

/// Rewrites auto-labels through the optional labelling provider.
///
/// Provider failures are advisory; the auto-label stays in place.
fn relabel(
    index: &HypergraphIndex,
    summaries: &mut [ClusterSummary],
    provider: &dyn LabelProvider,
) {
    for summary in summaries.iter_mut() {
        let sentences: Vec<String> = summary
            .exemplars
            .iter()
            .filter_map(|exemplar| exemplar_sentence(index, exemplar.event))
            .collect();
        match provider.label(&summary.top_entities, &summary.top_families, &sentences) {
            Ok((title, _summary_text)) if !title.trim().is_empty() => {
                summary.auto_label = title;
            }
            Ok(_) => {}
            Err(error) => {
                warn!(
                    cluster = summary.cluster,
                    %error,
                    "label provider failed; keeping auto-label"
                );
            }
        }
    }
}

fn exemplar_sentence(
    index: &HypergraphIndex,
    edge: crate::hypergraph::EdgeId,
) -> Option<String> {
    let verb = index.verb(edge)?;
    let join = |role: Role| {
        index
            .nodes_by_role(edge, role)
            .into_iter()
            .filter_map(|node| index.node_label(node))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let sources = join(Role::Source);
    let targets = join(Role::Target);
    Some(format!("{sources} {verb} {targets}").trim().to_owned())
}

/// Writes one build in relation order.
fn persist<S: PersistenceSink>(
    build: BuildId,
    sink: &mut S,
    vectors: &EventVectors,
    labeling: &Labeling,
    summaries: &[ClusterSummary],
) -> Result<()> {
    for (row, &event) in vectors.edge_ids().iter().enumerate() {
        let cluster = labeling.label_of(row).unwrap_or(NOISE);
        let record = AssignmentRecord {
            event,
            cluster,
            membership: labeling.membership(row),
        };
        sink.store_assignment(build, &record)
            .map_err(|source| persistence_error(PersistRelation::Assignments, source))?;
    }

    for summary in summaries {
        let record = ClusterRecord {
            cluster: summary.cluster,
            centroid: summary.centroid.clone(),
            label: summary.auto_label.clone(),
            size: summary.size,
            top_entities: summary.top_entities.clone(),
            top_families: summary.top_families.clone(),
        };
        sink.store_cluster(build, &record)
            .map_err(|source| persistence_error(PersistRelation::Clusters, source))?;
    }

    for (row, &event) in vectors.edge_ids().iter().enumerate() {
        let cluster = labeling.label_of(row).unwrap_or(NOISE);
        if cluster == NOISE {
            continue;
        }
        let record = MemberRecord {
            cluster,
            event,
            membership: labeling.membership(row),
        };
        sink.store_member(build, &record)
            .map_err(|source| persistence_error(PersistRelation::Members, source))?;
    }

    for summary in summaries {
        for exemplar in &summary.exemplars {
            let record = ExemplarRecord {
                cluster: summary.cluster,
                event: exemplar.event,
                rank: exemplar.rank,
            };
            sink.store_exemplar(build, &record)
                .map_err(|source| persistence_error(PersistRelation::Exemplars, source))?;
        }
    }

    Ok(())
}

fn persistence_error(relation: PersistRelation, source: SinkError) -> CoreError {
    CoreError::Persistence {
        relation,
        source: Arc::from(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    use crate::{
        hypergraph::{HypergraphBuilder, Triple},
        persist::MemorySink,
        vectorizer::EmbeddingMap,
    };

    fn corpus() -> (HypergraphIndex, EmbeddingMap) {
        let mut builder = HypergraphBuilder::new();
        let mut triples = Vec::new();
        for chunk in 0..4 {
            triples.push(Triple::new("acquired", ["Apple"], ["Beats"], chunk));
            triples.push(Triple::new("sued", ["DOJ"], ["Google"], chunk + 10));
        }
        assert_eq!(builder.add_all(triples), 0);
        let index = builder.finish();

        let mut map = EmbeddingMap::new("corpus", 4);
        map.insert("Apple", vec![1.0, 0.0, 0.0, 0.0]);
        map.insert("Beats", vec![0.9, 0.1, 0.0, 0.0]);
        map.insert("DOJ", vec![0.0, 0.0, 1.0, 0.0]);
        map.insert("Google", vec![0.0, 0.0, 0.9, 0.1]);
        (index, map)
    }

    fn pipeline() -> Pipeline {
        PipelineBuilder::new()
            .with_context(CoreContext::new(
                NonZeroUsize::new(4).expect("literal 4 is non-zero"),
            ))
            .with_min_cluster_size(2)
            .with_min_samples(2)
            .build()
            .expect("configuration is valid")
    }

    #[test]
    fn builder_rejects_non_positive_parameters() {
        let err = PipelineBuilder::new()
            .with_min_cluster_size(0)
            .build()
            .expect_err("zero min_cluster_size must be rejected");
        assert_eq!(err.code().as_str(), "KIJI_INVALID_PARAMETERS");
    }

    #[test]
    fn run_persists_in_relation_order() {
        let (index, embeddings) = corpus();
        let mut sink = MemorySink::new();
        let report = pipeline()
            .run(
                BuildId::new(1),
                &index,
                &embeddings,
                &mut sink,
                None,
                &CancelToken::new(),
            )
            .expect("pipeline run must succeed");

        assert_eq!(report.events_vectorized, 8);
        assert_eq!(report.cluster_count, 2);
        assert_eq!(sink.assignments.len(), 8);
        assert_eq!(sink.clusters.len(), 2);
        assert_eq!(sink.members.len(), 8 - report.noise_count);
        assert!(!sink.exemplars.is_empty());
    }

    #[test]
    fn empty_embeddings_refuse_to_run() {
        let (index, _) = corpus();
        let mut sink = MemorySink::new();
        let err = pipeline()
            .run(
                BuildId::new(2),
                &index,
                &EmbeddingMap::new("empty", 4),
                &mut sink,
                None,
                &CancelToken::new(),
            )
            .expect_err("empty embeddings must be refused");
        assert_eq!(err.code().as_str(), "KIJI_NO_EMBEDDINGS");
        assert!(sink.assignments.is_empty());
    }

    #[test]
    fn unembedded_corpus_reports_no_events() {
        let mut builder = HypergraphBuilder::new();
        builder
            .add_triple(Triple::new("acquired", ["Ghost"], ["Phantom"], 1))
            .expect("triple has participants");
        let index = builder.finish();
        let mut embeddings = EmbeddingMap::new("sparse", 4);
        embeddings.insert("Elsewhere", vec![1.0, 0.0, 0.0, 0.0]);

        let mut sink = MemorySink::new();
        let err = pipeline()
            .run(
                BuildId::new(3),
                &index,
                &embeddings,
                &mut sink,
                None,
                &CancelToken::new(),
            )
            .expect_err("no vectors means no events");
        assert_eq!(err.code().as_str(), "KIJI_NO_EVENTS");
    }

    #[test]
    fn cancelled_run_writes_nothing() {
        let (index, embeddings) = corpus();
        let mut sink = MemorySink::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = pipeline()
            .run(
                BuildId::new(4),
                &index,
                &embeddings,
                &mut sink,
                None,
                &cancel,
            )
            .expect_err("cancelled run must stop");
        assert!(err.is_cancelled());
        assert!(sink.assignments.is_empty());
        assert!(sink.clusters.is_empty());
    }

    struct FailingSink;

    impl PersistenceSink for FailingSink {
        fn store_assignment(
            &mut self,
            _build: BuildId,
            _record: &AssignmentRecord,
        ) -> std::result::Result<(), SinkError> {
            Err("disk full".into())
        }

        fn store_cluster(
            &mut self,
            _build: BuildId,
            _record: &ClusterRecord,
        ) -> std::result::Result<(), SinkError> {
            Ok(())
        }

        fn store_member(
            &mut self,
            _build: BuildId,
            _record: &MemberRecord,
        ) -> std::result::Result<(), SinkError> {
            Ok(())
        }

        fn store_exemplar(
            &mut self,
            _build: BuildId,
            _record: &ExemplarRecord,
        ) -> std::result::Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn sink_failures_name_the_relation() {
        let (index, embeddings) = corpus();
        let err = pipeline()
            .run(
                BuildId::new(5),
                &index,
                &embeddings,
                &mut FailingSink,
                None,
                &CancelToken::new(),
            )
            .expect_err("failing sink must surface");
        match err {
            CoreError::Persistence { relation, source } => {
                assert_eq!(relation, PersistRelation::Assignments);
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    struct UpperCaser;

    impl LabelProvider for UpperCaser {
        fn label(
            &self,
            top_entities: &[crate::artifacts::TopEntity],
            _top_families: &[crate::artifacts::TopFamily],
            _exemplar_sentences: &[String],
        ) -> std::result::Result<(String, String), SinkError> {
            let title = top_entities
                .first()
                .map(|entity| entity.label.to_uppercase())
                .unwrap_or_default();
            Ok((title, String::new()))
        }
    }

    #[test]
    fn label_provider_overrides_auto_labels() {
        let (index, embeddings) = corpus();
        let mut sink = MemorySink::new();
        pipeline()
            .run(
                BuildId::new(6),
                &index,
                &embeddings,
                &mut sink,
                Some(&UpperCaser),
                &CancelToken::new(),
            )
            .expect("pipeline run must succeed");
        for (_, cluster) in &sink.clusters {
            assert_eq!(cluster.label, cluster.label.to_uppercase());
        }
    }
}
