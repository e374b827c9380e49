//! World map of career totals by country.

use crate::aggregator::Aggregation;
use crate::dataset::{Dataset, Warnings};
use crate::error::Result;
use crate::join::{enrich, JoinSpec};
use crate::query::{alpha3_by_country_name, to_country_values, CountryValue, Scope, COUNTRY_NAME};
use crate::schema::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CareerMetric {
    Championships,
    Wins,
    Poles,
    Podiums,
    /// Number of drivers or constructors.
    Entities,
}

impl CareerMetric {
    /// Career total column summed per country, `None` for a plain count.
    pub fn column(self) -> Option<&'static str> {
        match self {
            CareerMetric::Championships => Some("totalChampionshipWins"),
            CareerMetric::Wins => Some("totalRaceWins"),
            CareerMetric::Poles => Some("totalPolePositions"),
            CareerMetric::Podiums => Some("totalPodiums"),
            CareerMetric::Entities => None,
        }
    }
}

/// Metric per country of nationality (drivers) or origin (constructors).
/// Entities whose country does not resolve are left out of the map.
pub fn country_totals(
    ds: &Dataset,
    scope: Scope,
    metric: CareerMetric,
    warnings: &mut Warnings,
) -> Result<Vec<CountryValue>> {
    let entities = ds.load_or_warn(scope.table(), warnings);
    let countries = ds.load_or_warn(Table::Countries, warnings);
    let rows = enrich(
        &entities,
        &[JoinSpec::new("countries", &countries, scope.country_key(), "id")
            .attach_as("name", COUNTRY_NAME)],
    )?;

    let aggregation = match metric.column() {
        Some(column) => Aggregation::sum(COUNTRY_NAME, column),
        None => Aggregation::count(COUNTRY_NAME),
    };
    let groups = aggregation.run(&rows)?;
    let alpha3 = alpha3_by_country_name(ds, warnings)?;
    Ok(to_country_values(groups, &alpha3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dataset;

    fn flat(values: &[CountryValue]) -> Vec<(&str, f64)> {
        values.iter().map(|v| (v.country.as_str(), v.value)).collect()
    }

    #[test]
    fn test_driver_count_by_nationality() {
        let mut warnings = Warnings::new();
        let totals =
            country_totals(&dataset(), Scope::Drivers, CareerMetric::Entities, &mut warnings)
                .unwrap();
        assert_eq!(
            flat(&totals),
            vec![
                ("Germany", 1.0),
                ("Netherlands", 1.0),
                ("Spain", 1.0),
                ("United Kingdom", 1.0),
            ]
        );
        assert_eq!(totals[1].alpha3.as_deref(), Some("NLD"));
    }

    #[test]
    fn test_driver_wins_by_nationality() {
        let mut warnings = Warnings::new();
        let totals =
            country_totals(&dataset(), Scope::Drivers, CareerMetric::Wins, &mut warnings).unwrap();
        assert_eq!(
            flat(&totals),
            vec![
                ("United Kingdom", 105.0),
                ("Netherlands", 63.0),
                ("Germany", 53.0),
                ("Spain", 32.0),
            ]
        );
    }

    #[test]
    fn test_constructor_championships_by_country() {
        let mut warnings = Warnings::new();
        let totals = country_totals(
            &dataset(),
            Scope::Constructors,
            CareerMetric::Championships,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(
            flat(&totals),
            vec![("Italy", 16.0), ("Germany", 8.0), ("Austria", 6.0)]
        );
    }
}
