use arrow::record_batch::RecordBatch;
use arrow::array::{
    Array,
    BooleanArray,
    Float64Array,
    Int32Array,
    Int64Array,
    LargeStringArray,
    StringArray,
    StringViewArray,
};
use arrow::datatypes::DataType;
use serde_json::{Value, Number};
use common::{Error, Result};

/// Renders record batches as one JSON object per row. Used for preview and
/// defect samples in logs.
pub fn batches_to_json(batches: Vec<RecordBatch>) -> Result<Vec<Value>> {
    let mut json_rows = Vec::new();

    for batch in batches {
        for row_idx in 0..batch.num_rows() {
            let mut row = serde_json::Map::new();

            for (col_idx, field) in batch.schema().fields().iter().enumerate() {
                let column = batch.column(col_idx);
                let value = arrow_array_to_json(column, row_idx)?;
                row.insert(field.name().clone(), value);
            }

            json_rows.push(Value::Object(row));
        }
    }

    Ok(json_rows)
}

fn downcast<'a, T: 'static>(array: &'a dyn Array) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::Other(format!("Failed to downcast {} array", array.data_type()))
    })
}

pub fn arrow_array_to_json(array: &dyn Array, index: usize) -> Result<Value> {
    if array.is_null(index) {
        return Ok(Value::Null);
    }

    Ok(match array.data_type() {
        DataType::Boolean => Value::Bool(downcast::<BooleanArray>(array)?.value(index)),
        DataType::Int32 => Value::Number(Number::from(downcast::<Int32Array>(array)?.value(index))),
        DataType::Int64 => Value::Number(Number::from(downcast::<Int64Array>(array)?.value(index))),
        DataType::Float64 => Number::from_f64(downcast::<Float64Array>(array)?.value(index))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        DataType::Utf8 => Value::String(downcast::<StringArray>(array)?.value(index).to_string()),
        DataType::LargeUtf8 => {
            Value::String(downcast::<LargeStringArray>(array)?.value(index).to_string())
        }
        DataType::Utf8View => {
            Value::String(downcast::<StringViewArray>(array)?.value(index).to_string())
        }
        other => Value::String(format!("<{}>", other)),
    })
}
