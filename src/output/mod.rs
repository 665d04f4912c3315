//! Output module
//!
//! Turns record batches into JSON lines or Parquet files.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Converting Arrow RecordBatches back to JSON objects
//! - Writing Parquet files

mod json;
mod writer;

pub use json::arrow_to_json;
pub use writer::{write_batches_to_parquet, ParquetWriter, ParquetWriterConfig};
