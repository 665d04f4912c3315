//! Record materializer
//!
//! Converts remote resource metadata into the flat record handed to
//! downstream consumers, either one at a time or as an Arrow `RecordBatch`.
//!
//! Field order is fixed: `id`, `name`, `mimeType`, `modifiedTime`, `size`,
//! `kind`, `trashed`, `parents`, `webViewLink`.

use crate::error::Result;
use crate::remote::RemoteResource;
use arrow::array::{ArrayRef, BooleanArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Record field names, in output order
pub const FIELD_NAMES: [&str; 9] = [
    "id",
    "name",
    "mimeType",
    "modifiedTime",
    "size",
    "kind",
    "trashed",
    "parents",
    "webViewLink",
];

/// One materialized resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Milliseconds since the Unix epoch
    pub modified_time: Option<i64>,
    pub size: Option<i64>,
    /// `FILE` or `FOLDER`
    pub kind: String,
    pub trashed: bool,
    /// Parent ids rendered as `[a, b]`
    pub parents: Option<String>,
    pub web_view_link: Option<String>,
}

impl From<&RemoteResource> for Record {
    fn from(resource: &RemoteResource) -> Self {
        Self {
            id: resource.id.clone(),
            name: resource.name.clone(),
            mime_type: resource.mime_type.clone(),
            modified_time: resource.modified_time.map(|t| t.timestamp_millis()),
            size: resource.size,
            kind: resource.kind.as_str().to_string(),
            trashed: resource.trashed,
            parents: resource
                .parents
                .as_ref()
                .map(|parents| format!("[{}]", parents.join(", "))),
            web_view_link: resource.web_view_link.clone(),
        }
    }
}

impl Record {
    /// Whether the record describes a folder
    pub fn is_folder(&self) -> bool {
        self.kind == "FOLDER"
    }
}

/// Materialize a single resource
pub fn to_record(resource: &RemoteResource) -> Record {
    Record::from(resource)
}

/// Arrow schema of [`Record`]
pub fn record_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(FIELD_NAMES[0], DataType::Utf8, false),
        Field::new(FIELD_NAMES[1], DataType::Utf8, false),
        Field::new(FIELD_NAMES[2], DataType::Utf8, false),
        Field::new(FIELD_NAMES[3], DataType::Int64, true),
        Field::new(FIELD_NAMES[4], DataType::Int64, true),
        Field::new(FIELD_NAMES[5], DataType::Utf8, false),
        Field::new(FIELD_NAMES[6], DataType::Boolean, false),
        Field::new(FIELD_NAMES[7], DataType::Utf8, true),
        Field::new(FIELD_NAMES[8], DataType::Utf8, true),
    ]))
}

/// Build a typed `RecordBatch` from records
pub fn records_to_batch(records: &[Record]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.name.as_str()))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.mime_type.as_str()),
        )),
        Arc::new(records.iter().map(|r| r.modified_time).collect::<Int64Array>()),
        Arc::new(records.iter().map(|r| r.size).collect::<Int64Array>()),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.kind.as_str()))),
        Arc::new(records.iter().map(|r| Some(r.trashed)).collect::<BooleanArray>()),
        Arc::new(records.iter().map(|r| r.parents.as_deref()).collect::<StringArray>()),
        Arc::new(
            records
                .iter()
                .map(|r| r.web_view_link.as_deref())
                .collect::<StringArray>(),
        ),
    ];

    Ok(RecordBatch::try_new(record_schema(), columns)?)
}

#[cfg(test)]
mod tests;
