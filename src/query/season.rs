//! Season comparison between selected drivers.

use arrow::array::Array;
use arrow::compute::{max, min};
use tracing::warn;

use crate::aggregator::{Aggregation, GroupValue};
use crate::dataset::{Dataset, Warnings};
use crate::error::Result;
use crate::filter::{apply_filter, Predicate};
use crate::join::{enrich, JoinSpec};
use crate::query::{session_with_names, with_race_context, DRIVER_NAME, GRAND_PRIX_NAME};
use crate::resolver::{EntityKind, EntityResolver};
use crate::schema::Table;
use crate::utils::{distinct_strings, get_f64_column, get_i64_column, get_str_column};

/// Championship points of one driver in one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonPoints {
    pub year: i64,
    pub driver: String,
    pub points: Option<f64>,
}

/// Start and finish position of one race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFinish {
    pub grand_prix: Option<String>,
    pub grid: i64,
    pub finish: i64,
}

fn standings_with_names(
    ds: &Dataset,
    warnings: &mut Warnings,
) -> Result<arrow::array::RecordBatch> {
    let standings = ds.load_or_warn(Table::DriverStandings, warnings);
    let drivers = ds.load_or_warn(Table::Drivers, warnings);
    enrich(
        &standings,
        &[JoinSpec::new("drivers", &drivers, "driverId", "id").attach_as("name", DRIVER_NAME)],
    )
}

/// Resolve display names to ids; names that do not resolve are dropped with
/// a warning.
fn resolve_all(resolver: &EntityResolver, names: &[&str], warnings: &mut Warnings) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| match resolver.resolve_name_to_id(name) {
            Ok(id) => Some(id.to_string()),
            Err(e) => {
                warn!(error = %e, "skipping unresolved name");
                warnings.push(e.to_string());
                None
            }
        })
        .collect()
}

/// First and last season with driver standings.
pub fn year_bounds(ds: &Dataset, warnings: &mut Warnings) -> Result<Option<(i64, i64)>> {
    let standings = ds.load_or_warn(Table::DriverStandings, warnings);
    let years = get_i64_column(&standings, "year")?;
    Ok(min(&years).zip(max(&years)))
}

/// Names of drivers classified in the standings of any season in range.
pub fn drivers_in_range(
    ds: &Dataset,
    from: i64,
    to: i64,
    warnings: &mut Warnings,
) -> Result<Vec<String>> {
    let standings = standings_with_names(ds, warnings)?;
    let in_range = apply_filter(&standings, &[Predicate::years(from, to)])?;
    distinct_strings(&in_range, DRIVER_NAME)
}

/// Standings points per season for the selected drivers, by year.
pub fn points_by_season(
    ds: &Dataset,
    drivers: &[&str],
    from: i64,
    to: i64,
    warnings: &mut Warnings,
) -> Result<Vec<SeasonPoints>> {
    let resolver = ds.resolver(EntityKind::Driver, warnings)?;
    let ids = resolve_all(&resolver, drivers, warnings);
    let standings = standings_with_names(ds, warnings)?;
    let selected = apply_filter(
        &standings,
        &[Predicate::years(from, to), Predicate::in_set("driverId", ids)],
    )?;

    let years = get_i64_column(&selected, "year")?;
    let names = get_str_column(&selected, DRIVER_NAME)?;
    let points = get_f64_column(&selected, "points")?;
    let mut series: Vec<SeasonPoints> = (0..selected.num_rows())
        .filter(|&row| !years.is_null(row) && !names.is_null(row))
        .map(|row| SeasonPoints {
            year: years.value(row),
            driver: names.value(row).to_string(),
            points: (!points.is_null(row)).then(|| points.value(row)),
        })
        .collect();
    series.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.driver.cmp(&b.driver)));
    Ok(series)
}

/// Race wins of the selected drivers in range, most wins first.
pub fn wins_in_range(
    ds: &Dataset,
    drivers: &[&str],
    from: i64,
    to: i64,
    warnings: &mut Warnings,
) -> Result<Vec<GroupValue>> {
    let resolver = ds.resolver(EntityKind::Driver, warnings)?;
    let ids = resolve_all(&resolver, drivers, warnings);
    let results = session_with_names(ds, Table::RaceResults, warnings)?;
    Aggregation::count(DRIVER_NAME)
        .filters([
            Predicate::years(from, to),
            Predicate::win(),
            Predicate::in_set("driverId", ids),
        ])
        .run(&results)
}

/// Grid against finish position for every classified race of a driver in a
/// season. Pit-lane starts (grid 0) and rows without either position are
/// left out.
pub fn grid_vs_finish(
    ds: &Dataset,
    driver: &str,
    year: i64,
    warnings: &mut Warnings,
) -> Result<Vec<GridFinish>> {
    let resolver = ds.resolver(EntityKind::Driver, warnings)?;
    let driver_id = resolver.resolve_name_to_id(driver)?.to_string();

    let results = ds.load_or_warn(Table::RaceResults, warnings);
    let selected = apply_filter(
        &results,
        &[
            Predicate::equals("year", year),
            Predicate::equals("driverId", driver_id),
            Predicate::range("gridPositionNumber", Some(1.0), None),
            Predicate::not_null("positionNumber"),
        ],
    )?;
    let selected = with_race_context(&selected, ds, warnings)?;

    let grid = get_i64_column(&selected, "gridPositionNumber")?;
    let finish = get_i64_column(&selected, "positionNumber")?;
    let names = get_str_column(&selected, GRAND_PRIX_NAME)?;
    Ok((0..selected.num_rows())
        .map(|row| GridFinish {
            grand_prix: (!names.is_null(row)).then(|| names.value(row).to_string()),
            grid: grid.value(row),
            finish: finish.value(row),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::dataset;

    #[test]
    fn test_year_bounds() {
        let mut warnings = Warnings::new();
        assert_eq!(year_bounds(&dataset(), &mut warnings).unwrap(), Some((2010, 2011)));

        let dir = tempfile::tempdir().unwrap();
        let empty = Dataset::open(dir.path());
        assert_eq!(year_bounds(&empty, &mut warnings).unwrap(), None);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_drivers_in_range() {
        let mut warnings = Warnings::new();
        let names = drivers_in_range(&dataset(), 2011, 2011, &mut warnings).unwrap();
        assert_eq!(names, vec!["Fernando Alonso", "Lewis Hamilton", "Sebastian Vettel"]);
    }

    #[test]
    fn test_points_by_season_ordered_by_year() {
        let mut warnings = Warnings::new();
        let series = points_by_season(
            &dataset(),
            &["Sebastian Vettel", "Lewis Hamilton"],
            2010,
            2011,
            &mut warnings,
        )
        .unwrap();
        let flat: Vec<(i64, &str, Option<f64>)> = series
            .iter()
            .map(|p| (p.year, p.driver.as_str(), p.points))
            .collect();
        assert_eq!(
            flat,
            vec![
                (2010, "Lewis Hamilton", Some(240.0)),
                (2010, "Sebastian Vettel", Some(256.0)),
                (2011, "Lewis Hamilton", Some(227.0)),
                (2011, "Sebastian Vettel", Some(392.0)),
            ]
        );
    }

    #[test]
    fn test_wins_in_range_skips_unknown_names() {
        let mut warnings = Warnings::new();
        let wins = wins_in_range(
            &dataset(),
            &["Sebastian Vettel", "Fernando Alonso", "Lewis Hamilton", "Nigel Mansell"],
            2010,
            2010,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(
            wins,
            vec![
                GroupValue::new("Sebastian Vettel", 2.0),
                GroupValue::new("Fernando Alonso", 1.0),
            ]
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Nigel Mansell"));
    }

    #[test]
    fn test_grid_vs_finish() {
        let mut warnings = Warnings::new();
        let pairs = grid_vs_finish(&dataset(), "Lewis Hamilton", 2010, &mut warnings).unwrap();
        assert_eq!(
            pairs,
            vec![
                GridFinish {
                    grand_prix: Some("Monaco Grand Prix".to_string()),
                    grid: 5,
                    finish: 3
                },
                GridFinish {
                    grand_prix: Some("European Grand Prix".to_string()),
                    grid: 3,
                    finish: 2
                },
            ]
        );
    }

    #[test]
    fn test_grid_vs_finish_unknown_driver() {
        let mut warnings = Warnings::new();
        let err = grid_vs_finish(&dataset(), "Nobody", 2010, &mut warnings).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: EntityKind::Driver, .. }));
    }
}
