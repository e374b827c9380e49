//! Join-and-aggregate engine over the F1 historical dataset.
//!
//! Tables are loaded once into Arrow record batches ([`dataset`]), enriched
//! with reference attributes through left key joins ([`join`]), filtered and
//! grouped ([`filter`], [`aggregator`]). The [`query`] module builds the
//! dashboard views on top of these stages.

pub mod aggregator;
pub mod config;
pub mod dataset;
pub mod error;
pub mod expressions;
pub mod filter;
pub mod join;
pub mod providers;
pub mod query;
pub mod reader;
pub mod resolver;
pub mod schema;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
