//! Label-keyed embedding provider backed by Parquet columns.
use std::{collections::HashMap, fs::File, path::Path};

use arrow_array::{Array, FixedSizeListArray, RecordBatchReader, StringArray};

use kiji_core::EmbeddingSource;
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::file::reader::ChunkReader;

use crate::errors::EmbeddingProviderError;
use crate::ingest::{
    append_vector_values, read_labels, validate_label_field, validate_vector_field,
};

/// Embedding source backed by a contiguous row-major buffer keyed by label.
///
/// Rows are ingested from a Parquet file holding a non-nullable `Utf8`
/// label column and a `FixedSizeList<Float32, D>` vector column. Duplicate
/// labels resolve last-wins; the collision count is surfaced so callers can
/// log it.
#[derive(Debug)]
pub struct DenseEmbeddingProvider {
    name: String,
    dimension: usize,
    rows: HashMap<String, usize>,
    values: Vec<f32>,
    duplicate_labels: usize,
}

impl DenseEmbeddingProvider {
    pub(crate) fn from_parts(
        name: impl Into<String>,
        dimension: usize,
        labels: Vec<String>,
        values: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(values.len(), labels.len().saturating_mul(dimension));
        let mut rows = HashMap::with_capacity(labels.len());
        let mut duplicate_labels = 0usize;
        for (row, label) in labels.into_iter().enumerate() {
            if rows.insert(label, row).is_some() {
                duplicate_labels += 1;
            }
        }
        Self {
            name: name.into(),
            dimension,
            rows,
            values,
            duplicate_labels,
        }
    }

    /// Returns how many labels collided during ingestion (last row wins).
    #[must_use]
    pub fn duplicate_labels(&self) -> usize {
        self.duplicate_labels
    }

    /// Loads embeddings from a Parquet file on disk.
    ///
    /// # Errors
    /// Propagates [`EmbeddingProviderError`] for I/O, schema, and null-value
    /// failures.
    pub fn try_from_parquet_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        label_column: &str,
        vector_column: &str,
    ) -> Result<Self, EmbeddingProviderError> {
        let file = File::open(path)?;
        Self::try_from_parquet_reader(name, file, label_column, vector_column)
    }

    /// Loads embeddings from a Parquet reader.
    ///
    /// # Errors
    /// Propagates [`EmbeddingProviderError`] for schema and null-value
    /// failures.
    pub fn try_from_parquet_reader<R>(
        name: impl Into<String>,
        reader: R,
        label_column: &str,
        vector_column: &str,
    ) -> Result<Self, EmbeddingProviderError>
    where
        R: ChunkReader + Send + 'static,
    {
        let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
        let mask = ProjectionMask::columns(builder.parquet_schema(), [label_column, vector_column]);
        let reader = builder.with_projection(mask).build()?;
        let schema = reader.schema();

        let label_index =
            schema
                .index_of(label_column)
                .map_err(|_| EmbeddingProviderError::ColumnNotFound {
                    column: label_column.to_owned(),
                })?;
        let vector_index =
            schema
                .index_of(vector_column)
                .map_err(|_| EmbeddingProviderError::ColumnNotFound {
                    column: vector_column.to_owned(),
                })?;
        validate_label_field(schema.field(label_index), label_column)?;
        let dimension = validate_vector_field(schema.field(vector_index), vector_column)?;

        let mut labels = Vec::new();
        let mut values = Vec::new();
        let mut rows = 0usize;
        for batch in reader {
            let batch = batch?;
            let label_array = batch
                .column(label_index)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| EmbeddingProviderError::InvalidLabelColumnType {
                    column: label_column.to_owned(),
                    actual: batch.column(label_index).data_type().clone(),
                })?;
            let vector_array = batch
                .column(vector_index)
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| EmbeddingProviderError::InvalidVectorColumnType {
                    column: vector_column.to_owned(),
                    actual: batch.column(vector_index).data_type().clone(),
                })?;
            read_labels(label_array, rows, &mut labels)?;
            append_vector_values(vector_array, Some(dimension), rows, &mut values)?;
            rows += vector_array.len();
        }

        Ok(Self::from_parts(name, dimension, labels, values))
    }
}

impl EmbeddingSource for DenseEmbeddingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn embedding(&self, label: &str) -> Option<&[f32]> {
        let &row = self.rows.get(label)?;
        let start = row.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.values.get(start..end)
    }
}
