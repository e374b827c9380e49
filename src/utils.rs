//! Column access helpers shared by the pipeline stages

use std::collections::BTreeSet;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;

use crate::error::{Error, Result};

/// Look up a column by name, failing with a configuration error if absent.
pub fn column<'a>(batch: &'a RecordBatch, name: &str, context: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::unknown_column(context, name))
}

/// Get a column as Float64, casting with the safe kernel so values that do
/// not parse come back as null.
pub fn get_f64_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let col = column(batch, name, "numeric column")?;
    cast_f64(col, name)
}

pub(crate) fn cast_f64(col: &ArrayRef, name: &str) -> Result<Float64Array> {
    let cast_array = if col.data_type() == &DataType::Float64 {
        col.clone()
    } else {
        cast(col, &DataType::Float64).map_err(|_| Error::ColumnType {
            context: "numeric column".to_string(),
            column: name.to_string(),
            data_type: col.data_type().to_string(),
        })?
    };
    cast_array
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| Error::ColumnType {
            context: "numeric column".to_string(),
            column: name.to_string(),
            data_type: cast_array.data_type().to_string(),
        })
}

pub fn get_i64_column(batch: &RecordBatch, name: &str) -> Result<Int64Array> {
    let col = column(batch, name, "integer column")?;
    let cast_array = cast(col, &DataType::Int64)?;
    cast_array
        .as_any()
        .downcast_ref::<Int64Array>()
        .cloned()
        .ok_or_else(|| Error::ColumnType {
            context: "integer column".to_string(),
            column: name.to_string(),
            data_type: col.data_type().to_string(),
        })
}

/// Get a column rendered as text. Dates and numbers use Arrow's display
/// formatting.
pub fn get_str_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let col = column(batch, name, "text column")?;
    cast_str(col, name)
}

pub(crate) fn cast_str(col: &ArrayRef, name: &str) -> Result<StringArray> {
    let cast_array = cast(col, &DataType::Utf8)?;
    cast_array
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| Error::ColumnType {
            context: "text column".to_string(),
            column: name.to_string(),
            data_type: col.data_type().to_string(),
        })
}

/// Render a single cell, `None` for null.
pub fn cell(batch: &RecordBatch, name: &str, row: usize) -> Result<Option<String>> {
    let col = column(batch, name, "cell lookup")?;
    if row >= col.len() || col.is_null(row) {
        return Ok(None);
    }
    Ok(Some(array_value_to_string(col, row)?))
}

/// Distinct non-null values of a column, sorted.
pub fn distinct_strings(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let values = get_str_column(batch, name)?;
    let set: BTreeSet<&str> = values.iter().flatten().collect();
    Ok(set.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            (
                "points",
                Arc::new(StringArray::from(vec![Some("25"), Some("x"), None])) as ArrayRef,
            ),
            (
                "name",
                Arc::new(StringArray::from(vec![Some("B"), Some("A"), Some("B")])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_get_f64_column_nulls_unparseable() {
        let points = get_f64_column(&batch(), "points").unwrap();
        assert_eq!(points.value(0), 25.0);
        assert!(points.is_null(1));
        assert!(points.is_null(2));
    }

    #[test]
    fn test_missing_column_is_configuration_error() {
        let err = get_f64_column(&batch(), "laps").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_distinct_strings_sorted() {
        assert_eq!(distinct_strings(&batch(), "name").unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_cell() {
        let b = batch();
        assert_eq!(cell(&b, "points", 0).unwrap().as_deref(), Some("25"));
        assert_eq!(cell(&b, "points", 2).unwrap(), None);
    }
}
