//! Arrow to JSON conversion
//!
//! Record batches are turned back into JSON objects for line-oriented output.

use crate::error::{Error, Result};
use arrow::array::{Array, BooleanArray, Int32Array, Int64Array, LargeStringArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};

/// Convert an Arrow RecordBatch to JSON records
///
/// Returns one JSON object per row, keys in schema order.
pub fn arrow_to_json(batch: &RecordBatch) -> Result<Vec<Value>> {
    let schema = batch.schema();
    let mut records = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let mut record = Map::new();
        for (idx, field) in schema.fields().iter().enumerate() {
            let value = array_value_to_json(batch.column(idx).as_ref(), row)?;
            record.insert(field.name().clone(), value);
        }
        records.push(Value::Object(record));
    }

    Ok(records)
}

/// Convert a single array element to JSON
fn array_value_to_json(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(downcast::<BooleanArray>(array)?.value(row)),
        DataType::Int32 => Value::from(downcast::<Int32Array>(array)?.value(row)),
        DataType::Int64 => Value::from(downcast::<Int64Array>(array)?.value(row)),
        DataType::Utf8 => Value::from(downcast::<StringArray>(array)?.value(row)),
        DataType::LargeUtf8 => Value::from(downcast::<LargeStringArray>(array)?.value(row)),
        other => {
            return Err(Error::output(format!(
                "Unsupported column type for JSON output: {other}"
            )))
        }
    };
    Ok(value)
}

fn downcast<T: 'static>(array: &dyn Array) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::output(format!(
            "Failed to downcast {} column",
            array.data_type()
        ))
    })
}
