//! Group-by aggregation over an enriched row-set
//!
//! Rows are filtered, bucketed by the group column and folded into one
//! [`AggState`] per group. Rows with a null group key are dropped. Groups
//! that end up with nothing to aggregate are omitted rather than reported as
//! zero, so `mean` never divides by zero.

use std::collections::HashMap;
use std::fmt;

use arrow::array::{Array, ArrayRef, Float64Array, RecordBatch};
use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::{apply_filter, Predicate};
use crate::utils::{cast_f64, cast_str, column, get_i64_column};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFn {
    /// Number of rows in the group; needs no metric.
    Count,
    Sum,
    Mean,
    Max,
}

impl AggFn {
    pub fn name(self) -> &'static str {
        match self {
            AggFn::Count => "count",
            AggFn::Sum => "sum",
            AggFn::Mean => "mean",
            AggFn::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupOrder {
    /// Largest value first; ties by ascending key.
    #[default]
    ValueDescending,
    /// Smallest value first; ties by ascending key.
    ValueAscending,
    /// Ascending key, for chronological series.
    KeyAscending,
}

/// Value of the group-by column for one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Int(i64),
    Text(String),
}

impl GroupKey {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GroupKey::Text(s) => Some(s),
            GroupKey::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            GroupKey::Int(v) => Some(*v),
            GroupKey::Text(_) => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Int(v) => f.pad(&v.to_string()),
            GroupKey::Text(s) => f.pad(s),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        GroupKey::Text(s.to_string())
    }
}

impl From<i64> for GroupKey {
    fn from(v: i64) -> Self {
        GroupKey::Int(v)
    }
}

/// One output row: a group and its aggregated value.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupValue {
    pub key: GroupKey,
    pub value: f64,
}

impl GroupValue {
    pub fn new(key: impl Into<GroupKey>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Running state for a single group
#[derive(Debug, Clone, Default)]
pub struct AggState {
    pub rows: u64,
    /// Non-null metric values seen
    pub values: u64,
    pub sum: f64,
    pub max: Option<f64>,
}

impl AggState {
    fn push(&mut self, metric: Option<f64>) {
        self.rows += 1;
        if let Some(v) = metric {
            self.values += 1;
            self.sum += v;
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    /// Final value, `None` when the group has nothing to aggregate.
    pub fn finish(&self, agg_fn: AggFn) -> Option<f64> {
        match agg_fn {
            AggFn::Count => (self.rows > 0).then_some(self.rows as f64),
            AggFn::Sum => (self.values > 0).then_some(self.sum),
            AggFn::Mean => (self.values > 0).then(|| self.sum / self.values as f64),
            AggFn::Max => self.max,
        }
    }
}

/// A full aggregation request.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub group_by: String,
    pub metric: Option<String>,
    pub agg_fn: AggFn,
    pub filters: Vec<Predicate>,
    pub order: GroupOrder,
    /// Keep only groups whose value is strictly greater.
    pub keep_above: Option<f64>,
}

impl Aggregation {
    pub fn new(group_by: &str, agg_fn: AggFn, metric: Option<&str>) -> Self {
        Self {
            group_by: group_by.to_string(),
            metric: metric.map(str::to_string),
            agg_fn,
            filters: Vec::new(),
            order: GroupOrder::default(),
            keep_above: None,
        }
    }

    pub fn count(group_by: &str) -> Self {
        Self::new(group_by, AggFn::Count, None)
    }

    pub fn sum(group_by: &str, metric: &str) -> Self {
        Self::new(group_by, AggFn::Sum, Some(metric))
    }

    pub fn mean(group_by: &str, metric: &str) -> Self {
        Self::new(group_by, AggFn::Mean, Some(metric))
    }

    pub fn max(group_by: &str, metric: &str) -> Self {
        Self::new(group_by, AggFn::Max, Some(metric))
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.filters.extend(predicates);
        self
    }

    pub fn order(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    pub fn keep_above(mut self, threshold: f64) -> Self {
        self.keep_above = Some(threshold);
        self
    }

    pub fn run(&self, rows: &RecordBatch) -> Result<Vec<GroupValue>> {
        // Validate columns up front so an empty input still reports a bad spec.
        column(rows, &self.group_by, "group by")?;
        let metric = match (self.agg_fn, self.metric.as_deref()) {
            (AggFn::Count, _) => None,
            (_, Some(metric)) => {
                column(rows, metric, "aggregation metric")?;
                Some(metric)
            }
            (agg_fn, None) => {
                return Err(Error::MissingMetric {
                    agg_fn: agg_fn.name(),
                })
            }
        };

        let filtered = apply_filter(rows, &self.filters)?;
        if filtered.num_rows() == 0 {
            debug!(group_by = %self.group_by, "no rows left after filtering");
            return Ok(Vec::new());
        }

        let keys = group_keys(&filtered, &self.group_by)?;
        let metric_values = match metric {
            Some(name) => Some(cast_f64(column(&filtered, name, "aggregation metric")?, name)?),
            None => None,
        };

        let mut groups: HashMap<GroupKey, AggState> = HashMap::new();
        for (row, key) in keys.into_iter().enumerate() {
            let Some(key) = key else { continue };
            let value = metric_values.as_ref().and_then(|m| value_at(m, row));
            groups.entry(key).or_default().push(value);
        }

        let mut results: Vec<GroupValue> = groups
            .into_iter()
            .filter_map(|(key, state)| {
                state
                    .finish(self.agg_fn)
                    .map(|value| GroupValue { key, value })
            })
            .filter(|g| self.keep_above.map_or(true, |t| g.value > t))
            .collect();
        sort_groups(&mut results, self.order);

        debug!(
            group_by = %self.group_by,
            agg = self.agg_fn.name(),
            groups = results.len(),
            "aggregated"
        );
        Ok(results)
    }
}

/// `aggregate(rows, group_by, metric, agg_fn, filters)` with the default
/// value-descending order.
pub fn aggregate(
    rows: &RecordBatch,
    group_by: &str,
    metric: Option<&str>,
    agg_fn: AggFn,
    filters: &[Predicate],
) -> Result<Vec<GroupValue>> {
    Aggregation::new(group_by, agg_fn, metric)
        .filters(filters.iter().cloned())
        .run(rows)
}

pub fn sort_groups(groups: &mut [GroupValue], order: GroupOrder) {
    match order {
        GroupOrder::ValueDescending => {
            groups.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.key.cmp(&b.key)))
        }
        GroupOrder::ValueAscending => {
            groups.sort_by(|a, b| a.value.total_cmp(&b.value).then_with(|| a.key.cmp(&b.key)))
        }
        GroupOrder::KeyAscending => groups.sort_by(|a, b| a.key.cmp(&b.key)),
    }
}

/// Sum of a column over all rows, skipping nulls.
pub fn column_total(rows: &RecordBatch, metric: &str) -> Result<f64> {
    let values = cast_f64(column(rows, metric, "total")?, metric)?;
    Ok(values.iter().flatten().sum())
}

fn value_at(values: &Float64Array, row: usize) -> Option<f64> {
    (!values.is_null(row)).then(|| values.value(row))
}

/// Integer-typed group columns keep numeric keys so years sort numerically;
/// everything else groups on its text rendering.
fn group_keys(batch: &RecordBatch, name: &str) -> Result<Vec<Option<GroupKey>>> {
    let col: &ArrayRef = column(batch, name, "group by")?;
    if col.data_type().is_integer() {
        let ints = get_i64_column(batch, name)?;
        return Ok(ints.iter().map(|v| v.map(GroupKey::Int)).collect());
    }
    let texts = cast_str(col, name)?;
    Ok(texts
        .iter()
        .map(|v| v.map(|s| GroupKey::Text(s.to_string())))
        .collect())
}
