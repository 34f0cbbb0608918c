//! Command-line interface orchestration for the kiji analytics pipeline.
//!
//! The CLI offers a single `run` command that loads a tab-separated triple
//! corpus plus a Parquet embedding table, executes the full pipeline against
//! an in-memory sink, and renders the resulting story themes.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use kiji_core::{
    BuildId, CancelToken, CoreContext, CoreError, HypergraphBuilder, MemorySink, PipelineBuilder,
    PipelineReport,
};
use kiji_providers_dense::{DenseEmbeddingProvider, EmbeddingProviderError};
use kiji_providers_triples::{TripleParseError, parse_triples};

const DEFAULT_MIN_CLUSTER_SIZE: i64 = 5;
const DEFAULT_MIN_SAMPLES: i64 = 5;
const DEFAULT_BATCH_SIZE: usize = 256;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "kiji", about = "Execute the kiji knowledge-graph analytics pipeline.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Cluster a triple corpus into story themes.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to a tab-separated triple corpus.
    #[arg(long)]
    pub triples: PathBuf,

    /// Path to a Parquet embedding table.
    #[arg(long)]
    pub embeddings: PathBuf,

    /// Column holding node labels.
    #[arg(long, default_value = "label")]
    pub label_column: String,

    /// Column holding `FixedSizeList<Float32, D>` embedding rows.
    #[arg(long, default_value = "embedding")]
    pub vector_column: String,

    /// Minimum number of events per theme.
    #[arg(long, default_value_t = DEFAULT_MIN_CLUSTER_SIZE)]
    pub min_cluster_size: i64,

    /// Density smoothing parameter.
    #[arg(long, default_value_t = DEFAULT_MIN_SAMPLES)]
    pub min_samples: i64,

    /// Vectorizer batch size.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Identifier recorded against this run's artifacts.
    #[arg(long, default_value_t = 1)]
    pub build_id: u64,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while loading an input source.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The batch size must be positive.
    #[error("batch size must be positive")]
    ZeroBatchSize,
    /// Embedding ingestion failed.
    #[error(transparent)]
    Embeddings(#[from] EmbeddingProviderError),
    /// Triple parsing failed.
    #[error(transparent)]
    Triples(#[from] TripleParseError),
    /// Core pipeline execution failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// One rendered theme row.
#[derive(Debug, Clone)]
pub struct ThemeLine {
    /// Cluster label within the build.
    pub cluster: i64,
    /// Member count.
    pub size: usize,
    /// Display label.
    pub title: String,
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Pipeline run report.
    pub report: PipelineReport,
    /// Triples rejected at ingestion for having no participants.
    pub rejected_triples: usize,
    /// One line per discovered theme, densest first.
    pub themes: Vec<ThemeLine>,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading inputs or running the pipeline fails.
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Run(command) => run_pipeline(command),
    }
}

fn run_pipeline(command: RunCommand) -> Result<ExecutionSummary, CliError> {
    let triples_file = File::open(&command.triples).map_err(|source| CliError::Io {
        path: command.triples.clone(),
        source,
    })?;
    let triples = parse_triples(BufReader::new(triples_file))?;

    let embeddings = DenseEmbeddingProvider::try_from_parquet_path(
        command
            .embeddings
            .file_name()
            .map_or_else(|| "embeddings".to_owned(), |n| n.to_string_lossy().into_owned()),
        &command.embeddings,
        &command.label_column,
        &command.vector_column,
    )?;

    let mut builder = HypergraphBuilder::new();
    let rejected_triples = builder.add_all(triples);
    let index = builder.finish();

    let batch_size = NonZeroUsize::new(command.batch_size).ok_or(CliError::ZeroBatchSize)?;
    let dimension = NonZeroUsize::new(kiji_core::EmbeddingSource::dimension(&embeddings))
        .unwrap_or_else(|| NonZeroUsize::new(kiji_core::DEFAULT_DIMENSION).expect("non-zero"));
    let ctx = CoreContext::new(dimension).with_batch_size(batch_size);

    let estimate = kiji_core::estimate_peak_bytes(index.edge_count(), ctx.event_vector_width());
    tracing::info!(
        events = index.edge_count(),
        estimate = %kiji_core::format_bytes(estimate),
        "estimated peak clustering memory"
    );

    let pipeline = PipelineBuilder::new()
        .with_context(ctx)
        .with_min_cluster_size(command.min_cluster_size)
        .with_min_samples(command.min_samples)
        .build()?;

    let mut sink = MemorySink::new();
    let report = pipeline.run(
        BuildId::new(command.build_id),
        &index,
        &embeddings,
        &mut sink,
        None,
        &CancelToken::new(),
    )?;

    let mut themes: Vec<ThemeLine> = sink
        .clusters
        .iter()
        .map(|(_, cluster)| ThemeLine {
            cluster: cluster.cluster,
            size: cluster.size,
            title: cluster.label.clone(),
        })
        .collect();
    themes.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.cluster.cmp(&b.cluster)));

    Ok(ExecutionSummary {
        report,
        rejected_triples,
        themes,
    })
}

/// Renders the execution summary to the provided writer.
///
/// # Errors
/// Propagates I/O failures from the writer.
pub fn render_summary(summary: &ExecutionSummary, writer: &mut impl Write) -> io::Result<()> {
    writeln!(
        writer,
        "build {}: {} events vectorized, {} skipped, {} themes, {} noise",
        summary.report.build_id,
        summary.report.events_vectorized,
        summary.report.events_skipped,
        summary.report.cluster_count,
        summary.report.noise_count,
    )?;
    if summary.rejected_triples > 0 {
        writeln!(
            writer,
            "{} triples rejected at ingestion",
            summary.rejected_triples
        )?;
    }
    for theme in &summary.themes {
        writeln!(
            writer,
            "  theme {:>3}  {:>5} events  {}",
            theme.cluster, theme.size, theme.title,
        )?;
    }
    Ok(())
}
