//! Dense embedding provider for the kiji pipeline.
//!
//! Materialises a label-keyed embedding table from Parquet files whose rows
//! pair a `Utf8` node label with a `FixedSizeList<Float32, D>` vector, and
//! exposes it through `kiji_core::EmbeddingSource`.

mod errors;
mod ingest;
mod provider;

pub use crate::{errors::EmbeddingProviderError, provider::DenseEmbeddingProvider};
