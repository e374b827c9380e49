//! Row predicates evaluated with Arrow compute kernels
//!
//! A filter is a conjunction of predicates. Each predicate yields a boolean
//! mask; masks are AND-ed and nulls count as "no match", so a row whose
//! column is null never passes a comparison.

use std::collections::HashSet;
use std::fmt;

use arrow::array::{Array, BooleanArray, Float64Array, RecordBatch, Scalar, StringArray};
use arrow::compute::kernels::cmp;
use arrow::compute::{and, is_not_null};
use arrow_select::filter::{filter_record_batch, prep_null_mask_filter};

use crate::error::Result;
use crate::utils::{cast_f64, cast_str, column};

/// Literal compared against a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// Whether a result counts as a classified finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishStatus {
    Finished,
    NotFinished,
}

/// Classify a position-text value. Only a plain integer is a finish; any
/// status code ("Ret", "DSQ", "DNS", ...) or a missing value is not.
pub fn classify_finish(position_text: Option<&str>) -> FinishStatus {
    match position_text.map(|s| s.trim().parse::<i64>()) {
        Some(Ok(_)) => FinishStatus::Finished,
        _ => FinishStatus::NotFinished,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `min <= column <= max`; a missing bound is open.
    Range {
        column: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Column is one of the given values.
    InSet { column: String, values: Vec<Value> },
    Equals { column: String, value: Value },
    NotNull { column: String },
    /// Finish classification of a position-text column.
    Finish { column: String, status: FinishStatus },
}

impl Predicate {
    pub fn range(column: &str, min: Option<f64>, max: Option<f64>) -> Self {
        Predicate::Range {
            column: column.to_string(),
            min,
            max,
        }
    }

    /// Inclusive year range.
    pub fn years(from: i64, to: i64) -> Self {
        Self::range("year", Some(from as f64), Some(to as f64))
    }

    pub fn in_set<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::InSet {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn equals(column: &str, value: impl Into<Value>) -> Self {
        Predicate::Equals {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn not_null(column: &str) -> Self {
        Predicate::NotNull {
            column: column.to_string(),
        }
    }

    /// `positionNumber == 1`
    pub fn win() -> Self {
        Self::equals("positionNumber", 1i64)
    }

    /// `positionNumber in {1, 2, 3}`
    pub fn podium() -> Self {
        Self::in_set("positionNumber", [1i64, 2, 3])
    }

    /// `gridPositionNumber == 1`
    pub fn pole() -> Self {
        Self::equals("gridPositionNumber", 1i64)
    }

    pub fn finished() -> Self {
        Predicate::Finish {
            column: "positionText".to_string(),
            status: FinishStatus::Finished,
        }
    }

    pub fn not_finished() -> Self {
        Predicate::Finish {
            column: "positionText".to_string(),
            status: FinishStatus::NotFinished,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Range { column, .. }
            | Predicate::InSet { column, .. }
            | Predicate::Equals { column, .. }
            | Predicate::NotNull { column }
            | Predicate::Finish { column, .. } => column,
        }
    }

    /// Evaluate to a mask without nulls.
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let col = column(batch, self.column(), "filter")?;
        let mask = match self {
            Predicate::Range { column, min, max } => {
                let values = cast_f64(col, column)?;
                let mut mask = is_not_null(&values)?;
                if let Some(min) = min {
                    let bound = Scalar::new(Float64Array::from(vec![*min]));
                    mask = and(&mask, &cmp::gt_eq(&values, &bound)?)?;
                }
                if let Some(max) = max {
                    let bound = Scalar::new(Float64Array::from(vec![*max]));
                    mask = and(&mask, &cmp::lt_eq(&values, &bound)?)?;
                }
                mask
            }
            Predicate::Equals { column, value } => match value.as_f64() {
                Some(number) => {
                    let values = cast_f64(col, column)?;
                    let scalar = Scalar::new(Float64Array::from(vec![number]));
                    cmp::eq(&values, &scalar)?
                }
                None => {
                    let values = cast_str(col, column)?;
                    let scalar = Scalar::new(StringArray::from(vec![value.to_text()]));
                    cmp::eq(&values, &scalar)?
                }
            },
            Predicate::InSet { column, values } => {
                let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
                let texts: HashSet<String> = values.iter().map(Value::to_text).collect();
                if numbers.len() == values.len() {
                    let column_values = cast_f64(col, column)?;
                    column_values
                        .iter()
                        .map(|v| Some(v.is_some_and(|v| numbers.contains(&v))))
                        .collect()
                } else {
                    let column_values = cast_str(col, column)?;
                    column_values
                        .iter()
                        .map(|v| Some(v.is_some_and(|v| texts.contains(v))))
                        .collect()
                }
            }
            Predicate::NotNull { .. } => is_not_null(col)?,
            Predicate::Finish { column, status } => {
                let texts = cast_str(col, column)?;
                texts
                    .iter()
                    .map(|v| Some(classify_finish(v) == *status))
                    .collect()
            }
        };
        Ok(without_nulls(mask))
    }
}

impl Value {
    fn to_text(&self) -> String {
        match self {
            Value::Text(v) => v.clone(),
            other => other.to_string(),
        }
    }
}

fn without_nulls(mask: BooleanArray) -> BooleanArray {
    if mask.null_count() == 0 {
        mask
    } else {
        prep_null_mask_filter(&mask)
    }
}

/// Conjunction of all predicates; every row passes an empty filter.
pub fn create_filter_mask(batch: &RecordBatch, predicates: &[Predicate]) -> Result<BooleanArray> {
    let mut mask = BooleanArray::from(vec![true; batch.num_rows()]);
    for predicate in predicates {
        mask = and(&mask, &predicate.evaluate(batch)?)?;
    }
    Ok(mask)
}

/// Keep only rows that pass every predicate.
pub fn apply_filter(batch: &RecordBatch, predicates: &[Predicate]) -> Result<RecordBatch> {
    if predicates.is_empty() {
        return Ok(batch.clone());
    }
    let mask = create_filter_mask(batch, predicates)?;
    Ok(filter_record_batch(batch, &mask)?)
}

/// Number of rows passing every predicate.
pub fn count_matching_rows(batch: &RecordBatch, predicates: &[Predicate]) -> Result<usize> {
    Ok(create_filter_mask(batch, predicates)?.true_count())
}
