//! Derived columns computed with Arrow kernels

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, RecordBatch};
use arrow::compute::kernels::zip::zip;
use arrow_schema::{Field, FieldRef, Schema};

use crate::error::{Error, Result};
use crate::filter::{classify_finish, FinishStatus, Predicate};
use crate::utils::{get_f64_column, get_str_column};

pub const FINISHED: &str = "finished";
pub const TIME_OR_GAP: &str = "timeOrGap";
pub const DURATION_SECONDS: &str = "durationSeconds";

/// Append `column` to `batch` under `name`.
pub fn append_column(batch: &RecordBatch, name: &str, column: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    if schema.column_with_name(name).is_some() {
        return Err(Error::ColumnCollision {
            context: "derived column".to_string(),
            column: name.to_string(),
        });
    }
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(name, column.data_type().clone(), true)));
    let mut columns = batch.columns().to_vec();
    columns.push(column);
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// `finished`: whether `positionText` is a plain integer.
pub fn with_finish_status(batch: &RecordBatch) -> Result<RecordBatch> {
    let texts = get_str_column(batch, "positionText")?;
    let finished: BooleanArray = texts
        .iter()
        .map(|t| Some(classify_finish(t) == FinishStatus::Finished))
        .collect();
    append_column(batch, FINISHED, Arc::new(finished))
}

/// `timeOrGap`: the winner's race time, everybody else's gap to the winner.
/// Sessions that carry no gaps at all show the time for every row.
pub fn with_time_or_gap(batch: &RecordBatch) -> Result<RecordBatch> {
    let time = get_str_column(batch, "time")?;
    let gap = get_str_column(batch, "gap")?;
    let column: ArrayRef = if gap.null_count() == gap.len() {
        Arc::new(time)
    } else {
        let is_winner = Predicate::win().evaluate(batch)?;
        zip(&is_winner, &time, &gap)?
    };
    append_column(batch, TIME_OR_GAP, column)
}

/// `durationSeconds`: pit stop `time` parsed as seconds, null when it does
/// not parse.
pub fn with_duration_seconds(batch: &RecordBatch) -> Result<RecordBatch> {
    let seconds = get_f64_column(batch, "time")?;
    append_column(batch, DURATION_SECONDS, Arc::new(seconds))
}
