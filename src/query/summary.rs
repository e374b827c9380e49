//! Headline counts for the landing view.

use crate::dataset::{Dataset, Warnings};
use crate::schema::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub drivers: usize,
    pub races: usize,
    pub constructors: usize,
}

/// Row counts of the drivers, races and constructors tables; a missing table
/// counts as zero.
pub fn summary(ds: &Dataset, warnings: &mut Warnings) -> Summary {
    Summary {
        drivers: ds.load_or_warn(Table::Drivers, warnings).num_rows(),
        races: ds.load_or_warn(Table::Races, warnings).num_rows(),
        constructors: ds.load_or_warn(Table::Constructors, warnings).num_rows(),
    }
}
