//! Left outer key joins that attach reference attributes onto fact rows
//!
//! Each fact row is matched against at most one reference row (the first one
//! carrying the key), so the enriched batch has exactly the input's rows in
//! the input's order. Attached columns are gathered with the `take` kernel
//! using a nullable index array: unmatched rows get a null index and thus a
//! null value.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int64Array, RecordBatch, StringArray, UInt32Array};
use arrow::compute::cast;
use arrow_schema::{DataType, Field, FieldRef, Schema};
use arrow_select::take::take;
use tracing::debug;

use crate::error::{Error, Result};

/// One key join: which reference columns to attach, and under which names.
#[derive(Debug, Clone)]
pub struct JoinSpec<'a> {
    pub reference_name: &'a str,
    pub reference: &'a RecordBatch,
    pub fact_key: &'a str,
    pub reference_key: &'a str,
    /// `(reference column, output column)` pairs, in output order.
    pub attach: Vec<(&'a str, &'a str)>,
}

impl<'a> JoinSpec<'a> {
    pub fn new(
        reference_name: &'a str,
        reference: &'a RecordBatch,
        fact_key: &'a str,
        reference_key: &'a str,
    ) -> Self {
        Self {
            reference_name,
            reference,
            fact_key,
            reference_key,
            attach: Vec::new(),
        }
    }

    /// Attach a reference column under its own name.
    pub fn attach(mut self, column: &'a str) -> Self {
        self.attach.push((column, column));
        self
    }

    /// Attach a reference column under a new name.
    pub fn attach_as(mut self, column: &'a str, output: &'a str) -> Self {
        self.attach.push((column, output));
        self
    }

    fn collision(&self, column: &str) -> Error {
        Error::ColumnCollision {
            context: format!("join with {}", self.reference_name),
            column: column.to_string(),
        }
    }

    /// Check every column this spec names against the batches it will see.
    fn validate(&self, fact: &RecordBatch) -> Result<()> {
        let fact_schema = fact.schema();
        if fact_schema.column_with_name(self.fact_key).is_none() {
            return Err(Error::unknown_column("fact rows", self.fact_key));
        }
        let reference_schema = self.reference.schema();
        let context = format!("reference table {}", self.reference_name);
        let sources = self.attach.iter().map(|(source, _)| *source);
        for column in std::iter::once(self.reference_key).chain(sources) {
            if reference_schema.column_with_name(column).is_none() {
                return Err(Error::unknown_column(context.as_str(), column));
            }
        }

        // Each reference column is attached once, and every output name is new.
        let mut sources = HashSet::new();
        let mut outputs = HashSet::new();
        for &(source, output) in &self.attach {
            if !sources.insert(source) {
                return Err(self.collision(source));
            }
            if fact_schema.column_with_name(output).is_some() || !outputs.insert(output) {
                return Err(self.collision(output));
            }
        }
        Ok(())
    }
}

/// Apply `specs` left to right. A later spec may key on a column attached by
/// an earlier one.
pub fn enrich(fact: &RecordBatch, specs: &[JoinSpec<'_>]) -> Result<RecordBatch> {
    let mut current = fact.clone();
    for spec in specs {
        current = join_one(&current, spec)?;
    }
    Ok(current)
}

fn join_one(fact: &RecordBatch, spec: &JoinSpec<'_>) -> Result<RecordBatch> {
    spec.validate(fact)?;

    let fact_col = fact
        .column_by_name(spec.fact_key)
        .ok_or_else(|| Error::unknown_column("fact rows", spec.fact_key))?;
    let ref_col = spec
        .reference
        .column_by_name(spec.reference_key)
        .ok_or_else(|| Error::unknown_column(spec.reference_name, spec.reference_key))?;

    let indices = match_rows(fact_col, ref_col)?;
    debug!(
        reference = spec.reference_name,
        rows = fact.num_rows(),
        matched = indices.len() - indices.null_count(),
        "joined reference table"
    );

    let fact_schema = fact.schema();
    let mut fields: Vec<FieldRef> = fact_schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = fact.columns().to_vec();
    for &(source, output) in &spec.attach {
        let values = spec
            .reference
            .column_by_name(source)
            .ok_or_else(|| Error::unknown_column(spec.reference_name, source))?;
        let gathered = take(values.as_ref(), &indices, None)?;
        fields.push(Arc::new(Field::new(output, values.data_type().clone(), true)));
        columns.push(gathered);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// For every fact row, the index of the first reference row with an equal
/// key, or null.
fn match_rows(fact_key: &ArrayRef, reference_key: &ArrayRef) -> Result<UInt32Array> {
    if fact_key.data_type().is_integer() && reference_key.data_type().is_integer() {
        let fact = as_int64(fact_key)?;
        let reference = as_int64(reference_key)?;
        let mut index: HashMap<i64, u32> = HashMap::with_capacity(reference.len());
        for (row, key) in reference.iter().enumerate() {
            if let Some(key) = key {
                index.entry(key).or_insert(row as u32);
            }
        }
        Ok(fact.iter().map(|key| key.and_then(|k| index.get(&k).copied())).collect())
    } else {
        let fact = as_utf8(fact_key)?;
        let reference = as_utf8(reference_key)?;
        let mut index: HashMap<&str, u32> = HashMap::with_capacity(reference.len());
        for (row, key) in reference.iter().enumerate() {
            if let Some(key) = key {
                index.entry(key).or_insert(row as u32);
            }
        }
        Ok(fact.iter().map(|key| key.and_then(|k| index.get(k).copied())).collect())
    }
}

fn as_int64(col: &ArrayRef) -> Result<Int64Array> {
    let cast_array = cast(col, &DataType::Int64)?;
    Ok(cast_array
        .as_any()
        .downcast_ref::<Int64Array>()
        .cloned()
        .unwrap_or_else(|| Int64Array::new_null(col.len())))
}

fn as_utf8(col: &ArrayRef) -> Result<StringArray> {
    let cast_array = cast(col, &DataType::Utf8)?;
    Ok(cast_array
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .unwrap_or_else(|| StringArray::new_null(col.len())))
}
