//! RecordBatch helpers: synthetic range batches, equality with diagnostics, column
//! thresholding/relabeling, and column filtering.

use std::sync::Arc;

use arrow_array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};

use crate::error::StageError;

/// Builds a batch with columns `col_0..col_{cols-1}`, each an Int64 column holding `0..rows`.
pub fn range_batch(rows: usize, cols: usize) -> Result<RecordBatch, StageError> {
    let fields: Vec<Field> = (0..cols)
        .map(|i| Field::new(format!("col_{i}"), DataType::Int64, false))
        .collect();
    let columns: Vec<ArrayRef> = (0..cols)
        .map(|_| Arc::new(Int64Array::from_iter_values(0..rows as i64)) as ArrayRef)
        .collect();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Schema (names and types) and cell-level equality.
pub fn batches_equal(a: &RecordBatch, b: &RecordBatch) -> bool {
    first_difference(a, b).is_none()
}

/// Describes the first mismatch between two batches, or None when they are equal.
pub fn first_difference(a: &RecordBatch, b: &RecordBatch) -> Option<String> {
    if a.num_columns() != b.num_columns() {
        return Some(format!(
            "column count {} != {}",
            a.num_columns(),
            b.num_columns()
        ));
    }
    let schema_a = a.schema();
    let schema_b = b.schema();
    for (field_a, field_b) in schema_a.fields().iter().zip(schema_b.fields().iter()) {
        if field_a.name() != field_b.name() {
            return Some(format!(
                "column name '{}' != '{}'",
                field_a.name(),
                field_b.name()
            ));
        }
        if field_a.data_type() != field_b.data_type() {
            return Some(format!(
                "column '{}' type {} != {}",
                field_a.name(),
                field_a.data_type(),
                field_b.data_type()
            ));
        }
    }
    if a.num_rows() != b.num_rows() {
        return Some(format!("row count {} != {}", a.num_rows(), b.num_rows()));
    }
    for (idx, field) in schema_a.fields().iter().enumerate() {
        // ArrayData equality compares logical values, so sliced batches compare correctly.
        if a.column(idx).to_data() != b.column(idx).to_data() {
            return Some(format!("column '{}' values differ", field.name()));
        }
    }
    None
}

/// Maps every numeric column to `value > threshold` booleans, renaming column `i` to
/// `labels[i]`. This is the kernel of the classification stage.
pub fn threshold_batch(
    batch: &RecordBatch,
    threshold: f64,
    labels: &[String],
) -> Result<RecordBatch, StageError> {
    if labels.len() != batch.num_columns() {
        return Err(StageError::LabelCount {
            expected: batch.num_columns(),
            actual: labels.len(),
        });
    }

    let schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
    for (idx, label) in labels.iter().enumerate() {
        let column = batch.column(idx);
        let name = schema.field(idx).name();
        let flags: BooleanArray = match column.data_type() {
            DataType::Int64 => {
                let column = column
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .ok_or_else(|| StageError::UnsupportedColumn {
                        column: name.clone(),
                        datatype: column.data_type().to_string(),
                    })?;
                column
                    .iter()
                    .map(|v| v.map(|v| (v as f64) > threshold))
                    .collect()
            }
            DataType::Float64 => {
                let column = column
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| StageError::UnsupportedColumn {
                        column: name.clone(),
                        datatype: column.data_type().to_string(),
                    })?;
                column.iter().map(|v| v.map(|v| v > threshold)).collect()
            }
            other => {
                return Err(StageError::UnsupportedColumn {
                    column: name.clone(),
                    datatype: other.to_string(),
                })
            }
        };
        fields.push(Field::new(label.as_str(), DataType::Boolean, false));
        columns.push(Arc::new(flags) as ArrayRef);
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Keeps the columns selected by `include` (empty means all) minus those in `exclude`.
pub fn filter_columns(
    batch: &RecordBatch,
    include: &[String],
    exclude: &[String],
) -> Result<RecordBatch, StageError> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| {
            (include.is_empty() || include.iter().any(|n| n == field.name()))
                && !exclude.iter().any(|n| n == field.name())
        })
        .map(|(idx, _)| idx)
        .collect();
    Ok(batch.project(&keep)?)
}
