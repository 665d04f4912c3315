//! Tests for the record materializer

use super::*;
use crate::output::arrow_to_json;
use crate::remote::RemoteResource;
use arrow::array::{Array, Int64Array, StringArray};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

fn report() -> RemoteResource {
    RemoteResource::with_mime_type("f1", "report.csv", "text/csv")
        .with_parent("p1")
        .with_parent("p2")
        .with_size(2048)
        .with_modified_time(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap())
        .with_web_view_link("https://drive.example/f1")
}

#[test]
fn test_record_from_resource() {
    let record = Record::from(&report());

    assert_eq!(record.id, "f1");
    assert_eq!(record.mime_type, "text/csv");
    assert_eq!(record.modified_time, Some(1_700_000_000_123));
    assert_eq!(record.size, Some(2048));
    assert_eq!(record.kind, "FILE");
    assert_eq!(record.parents.as_deref(), Some("[p1, p2]"));
    assert!(!record.is_folder());
}

#[test]
fn test_absent_optionals_stay_null() {
    let record = to_record(&RemoteResource::folder("d1", "Docs"));

    assert_eq!(record.kind, "FOLDER");
    assert!(record.is_folder());
    assert_eq!(record.parents, None);
    assert_eq!(record.size, None);
    assert_eq!(record.modified_time, None);
    assert_eq!(record.web_view_link, None);
}

#[test]
fn test_serialized_field_order() {
    let text = serde_json::to_string(&Record::from(&report())).unwrap();
    let positions: Vec<usize> = FIELD_NAMES
        .iter()
        .map(|name| text.find(&format!("\"{name}\"")).unwrap())
        .collect();

    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}

#[test]
fn test_schema_matches_field_order() {
    let schema = record_schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, FIELD_NAMES.to_vec());
}

#[test]
fn test_records_to_batch() {
    let records = vec![
        Record::from(&report()),
        Record::from(&RemoteResource::folder("d1", "Docs")),
    ];
    let batch = records_to_batch(&records).unwrap();

    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 9);

    let names = batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(names.value(0), "report.csv");
    assert_eq!(names.value(1), "Docs");

    let sizes = batch
        .column(4)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(sizes.value(0), 2048);
    assert!(sizes.is_null(1));
}

#[test]
fn test_empty_batch_keeps_schema() {
    let batch = records_to_batch(&[]).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.schema(), record_schema());
}

#[test]
fn test_batch_renders_back_to_json() {
    let batch = records_to_batch(&[Record::from(&report())]).unwrap();
    let rows = arrow_to_json(&batch).unwrap();

    assert_eq!(
        rows[0],
        json!({
            "id": "f1",
            "name": "report.csv",
            "mimeType": "text/csv",
            "modifiedTime": 1_700_000_000_123_i64,
            "size": 2048,
            "kind": "FILE",
            "trashed": false,
            "parents": "[p1, p2]",
            "webViewLink": "https://drive.example/f1"
        })
    );
}
