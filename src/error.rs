//! Error types for `f1-stats`.
//!
//! Every variant has a defined degraded behaviour at the query layer:
//! unavailable tables become empty row-sets with a warning, unresolved names
//! become "unknown", unreachable services drop the visual element. Only the
//! column errors are fatal, since join and aggregation specs are static.

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

use crate::resolver::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("table {table} is unavailable: {reason}")]
    DataUnavailable { table: &'static str, reason: String },

    #[error("{kind} not found: {key:?}")]
    NotFound { kind: EntityKind, key: String },

    #[error("{kind} name {name:?} is shared by several ids: {ids:?}")]
    AmbiguousName {
        kind: EntityKind,
        name: String,
        ids: Vec<String>,
    },

    #[error("unknown column {column:?} in {context}")]
    UnknownColumn { context: String, column: String },

    #[error("column {column:?} in {context} has unsupported type {data_type}")]
    ColumnType {
        context: String,
        column: String,
        data_type: String,
    },

    #[error("column {column:?} already exists in {context}")]
    ColumnCollision { context: String, column: String },

    #[error("aggregation {agg_fn} needs a metric column")]
    MissingMetric { agg_fn: &'static str },

    #[error("{service} unavailable: {reason}")]
    ExternalServiceUnavailable { service: &'static str, reason: String },

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a configuration error that should abort the pipeline
    /// instead of degrading.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownColumn { .. }
                | Error::ColumnType { .. }
                | Error::ColumnCollision { .. }
                | Error::MissingMetric { .. }
        )
    }

    /// Whether this is a resolution failure (name or id not found).
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::AmbiguousName { .. })
    }

    pub(crate) fn unknown_column(context: impl Into<String>, column: impl Into<String>) -> Self {
        Error::UnknownColumn {
            context: context.into(),
            column: column.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
