//! JSON rendering of Arrow batches for web front-ends.
//!
//! Each row becomes an object keyed by column name. Nulls map to `null`;
//! types without a native JSON form are rendered with Arrow's display
//! formatter.

use crate::{Error, Result};
use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
    UInt64Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use serde_json::{Map, Value};

/// Convert a batch into a vector of JSON row objects.
///
/// # Errors
///
/// Returns `Other` if a column cannot be downcast to its declared type, or
/// `Arrow` if a fallback value cannot be formatted
pub fn record_batch_to_json(batch: &RecordBatch) -> Result<Vec<Value>> {
    let schema = batch.schema();
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row_idx in 0..batch.num_rows() {
        let mut row = Map::with_capacity(schema.fields().len());
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            row.insert(field.name().clone(), array_value_to_json(column.as_ref(), row_idx)?);
        }
        rows.push(Value::Object(row));
    }

    Ok(rows)
}

/// Convert a batch into a pretty-printed JSON array string.
///
/// # Errors
///
/// As [`record_batch_to_json`], plus `Json` if serialization fails
pub fn record_batch_to_json_string(batch: &RecordBatch) -> Result<String> {
    Ok(serde_json::to_string_pretty(&record_batch_to_json(batch)?)?)
}

fn downcast<T: 'static>(array: &dyn Array) -> Result<&T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::Other(format!("downcast failed for {}", array.data_type())))
}

/// Extract a single value from an Arrow array as JSON.
///
/// # Errors
///
/// See [`record_batch_to_json`]
pub fn array_value_to_json(array: &dyn Array, idx: usize) -> Result<Value> {
    if array.is_null(idx) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Boolean => Value::Bool(downcast::<BooleanArray>(array)?.value(idx)),
        DataType::Int32 => Value::from(downcast::<Int32Array>(array)?.value(idx)),
        DataType::Int64 => Value::from(downcast::<Int64Array>(array)?.value(idx)),
        DataType::UInt64 => Value::from(downcast::<UInt64Array>(array)?.value(idx)),
        // Non-finite floats have no JSON form and become null
        DataType::Float32 => Value::from(f64::from(downcast::<Float32Array>(array)?.value(idx))),
        DataType::Float64 => Value::from(downcast::<Float64Array>(array)?.value(idx)),
        DataType::Utf8 => Value::String(downcast::<StringArray>(array)?.value(idx).to_string()),
        _ => Value::String(array_value_to_string(array, idx)?),
    };
    Ok(value)
}
