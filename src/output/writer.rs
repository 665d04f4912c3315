//! Parquet file writer
//!
//! Writes record batches to a Parquet file. The file always carries the
//! listing schema, so an empty traversal still produces a readable file.

use crate::error::{Error, Result};
use crate::record::record_schema;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 64 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a codec by name: `none`, `snappy`, `gzip` or `zstd`
    pub fn with_codec(mut self, name: &str) -> Result<Self> {
        self.compression = match name.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Compression::UNCOMPRESSED,
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "zstd" => Compression::ZSTD(ZstdLevel::default()),
            other => {
                return Err(Error::InvalidConfigValue {
                    field: "compression".to_string(),
                    message: format!("unknown codec '{other}'"),
                })
            }
        };
        Ok(self)
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet file writer
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    schema: SchemaRef,
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a writer for listing records
    pub fn create(path: impl AsRef<Path>, config: &ParquetWriterConfig) -> Result<Self> {
        Self::with_schema(path, record_schema(), config)
    }

    /// Create a writer for an arbitrary schema
    pub fn with_schema(
        path: impl AsRef<Path>,
        schema: SchemaRef,
        config: &ParquetWriterConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            Error::output(format!("Failed to create file '{}': {e}", path.display()))
        })?;

        let writer = ArrowWriter::try_new(file, schema.clone(), Some(config.build_properties()))
            .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;

        Ok(Self {
            writer,
            schema,
            rows_written: 0,
        })
    }

    /// Write a RecordBatch to the file
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        if batch.schema().fields() != self.schema.fields() {
            return Err(Error::output("Batch schema does not match the file schema"));
        }
        self.writer
            .write(batch)
            .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;

        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Get the number of rows written so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Close the writer and finalize the file
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer
            .close()
            .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;
        Ok(rows)
    }
}

/// Write listing batches to one Parquet file, returning the row count
pub fn write_batches_to_parquet(
    path: impl AsRef<Path>,
    batches: &[RecordBatch],
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let mut writer = ParquetWriter::create(path, config)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()
}
