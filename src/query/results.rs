//! Historical session results and pit stop analysis for a single race.

use std::collections::{BTreeSet, HashMap};

use arrow::array::Array;
use tracing::debug;

use crate::aggregator::{AggFn, Aggregation, GroupOrder};
use crate::dataset::{Dataset, Warnings};
use crate::error::{Error, Result};
use crate::expressions::{with_duration_seconds, with_time_or_gap, DURATION_SECONDS, TIME_OR_GAP};
use crate::filter::{apply_filter, count_matching_rows, Predicate};
use crate::join::{enrich, JoinSpec};
use crate::query::{session_with_names, DRIVER_NAME, TEAM_NAME};
use crate::resolver::{EntityKind, UNKNOWN};
use crate::schema::{Session, Table};
use crate::utils::{distinct_strings, get_f64_column, get_i64_column, get_str_column};

/// One line of a session classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRow {
    pub position_text: Option<String>,
    pub position: Option<i64>,
    pub driver_number: Option<i64>,
    pub driver: String,
    pub team: String,
    pub time_or_gap: Option<String>,
    pub laps: Option<i64>,
    pub points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitStopSummary {
    pub driver: String,
    pub mean_seconds: f64,
    /// Highest stop number recorded for the driver.
    pub stops: Option<i64>,
}

/// Seasons with at least one race, latest first.
pub fn years(ds: &Dataset, warnings: &mut Warnings) -> Result<Vec<i64>> {
    let races = ds.load_or_warn(Table::Races, warnings);
    let years: BTreeSet<i64> = get_i64_column(&races, "year")?.iter().flatten().collect();
    Ok(years.into_iter().rev().collect())
}

/// Full names of the grands prix held in `year`, sorted.
pub fn grands_prix_in_year(
    ds: &Dataset,
    year: i64,
    warnings: &mut Warnings,
) -> Result<Vec<String>> {
    let races = ds.load_or_warn(Table::Races, warnings);
    let grands_prix = ds.load_or_warn(Table::GrandsPrix, warnings);
    let in_year = apply_filter(&races, &[Predicate::equals("year", year)])?;
    let named = enrich(
        &in_year,
        &[JoinSpec::new("grands-prix", &grands_prix, "grandPrixId", "id").attach("fullName")],
    )?;
    distinct_strings(&named, "fullName")
}

/// Id of the race of a grand prix in a season.
pub fn race_id(ds: &Dataset, year: i64, grand_prix: &str, warnings: &mut Warnings) -> Result<i64> {
    let resolver = ds.resolver(EntityKind::GrandPrix, warnings)?;
    let gp_id = resolver.resolve_name_to_id(grand_prix)?;
    let races = ds.load_or_warn(Table::Races, warnings);
    let race = apply_filter(
        &races,
        &[Predicate::equals("year", year), Predicate::equals("grandPrixId", gp_id)],
    )?;
    get_i64_column(&race, "raceId")?
        .iter()
        .flatten()
        .next()
        .ok_or_else(|| Error::NotFound {
            kind: EntityKind::GrandPrix,
            key: format!("{grand_prix} {year}"),
        })
}

/// Sessions that have results for the race. A session whose table is not
/// part of the dataset is simply not offered.
pub fn available_sessions(ds: &Dataset, race_id: i64) -> Result<Vec<Session>> {
    let mut sessions = Vec::new();
    for session in Session::ALL {
        let rows = match ds.load(session.table()) {
            Ok(rows) => rows,
            Err(e) => {
                debug!(session = session.label(), error = %e, "session not available");
                continue;
            }
        };
        if count_matching_rows(&rows, &[Predicate::equals("raceId", race_id)])? > 0 {
            sessions.push(session);
        }
    }
    Ok(sessions)
}

/// Classification of one session of a race, in file order.
pub fn session_classification(
    ds: &Dataset,
    session: Session,
    race_id: i64,
    warnings: &mut Warnings,
) -> Result<Vec<ClassificationRow>> {
    let rows = session_with_names(ds, session.table(), warnings)?;
    let rows = apply_filter(&rows, &[Predicate::equals("raceId", race_id)])?;
    let rows = with_time_or_gap(&rows)?;

    let position_text = get_str_column(&rows, "positionText")?;
    let position = get_i64_column(&rows, "positionNumber")?;
    let number = get_i64_column(&rows, "driverNumber")?;
    let driver = get_str_column(&rows, DRIVER_NAME)?;
    let team = get_str_column(&rows, TEAM_NAME)?;
    let time_or_gap = get_str_column(&rows, TIME_OR_GAP)?;
    let laps = get_i64_column(&rows, "laps")?;
    let points = get_f64_column(&rows, "points")?;

    let text = |col: &arrow::array::StringArray, row: usize| {
        (!col.is_null(row)).then(|| col.value(row).to_string())
    };
    Ok((0..rows.num_rows())
        .map(|row| ClassificationRow {
            position_text: text(&position_text, row),
            position: (!position.is_null(row)).then(|| position.value(row)),
            driver_number: (!number.is_null(row)).then(|| number.value(row)),
            driver: text(&driver, row).unwrap_or_else(|| UNKNOWN.to_string()),
            team: text(&team, row).unwrap_or_else(|| UNKNOWN.to_string()),
            time_or_gap: text(&time_or_gap, row),
            laps: (!laps.is_null(row)).then(|| laps.value(row)),
            points: (!points.is_null(row)).then(|| points.value(row)),
        })
        .collect())
}

/// Mean stop duration and number of stops per driver, quickest first.
/// Stops whose time does not parse are ignored; a driver with no usable
/// stop is left out.
pub fn pit_stop_summary(
    ds: &Dataset,
    race_id: i64,
    warnings: &mut Warnings,
) -> Result<Vec<PitStopSummary>> {
    let pit_stops = ds.load_or_warn(Table::PitStops, warnings);
    let drivers = ds.load_or_warn(Table::Drivers, warnings);
    let in_race = apply_filter(&pit_stops, &[Predicate::equals("raceId", race_id)])?;
    let rows = enrich(
        &in_race,
        &[JoinSpec::new("drivers", &drivers, "driverId", "id").attach_as("name", DRIVER_NAME)],
    )?;
    let rows = with_duration_seconds(&rows)?;

    let means = Aggregation::mean(DRIVER_NAME, DURATION_SECONDS)
        .order(GroupOrder::ValueAscending)
        .run(&rows)?;
    let stops: HashMap<String, f64> = Aggregation::new(DRIVER_NAME, AggFn::Max, Some("stop"))
        .run(&rows)?
        .into_iter()
        .map(|g| (g.key.to_string(), g.value))
        .collect();

    Ok(means
        .into_iter()
        .map(|g| {
            let driver = g.key.to_string();
            PitStopSummary {
                stops: stops.get(&driver).map(|&s| s as i64),
                driver,
                mean_seconds: g.value,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::dataset;

    #[test]
    fn test_years_descending() {
        let mut warnings = Warnings::new();
        assert_eq!(years(&dataset(), &mut warnings).unwrap(), vec![2011, 2010]);
    }

    #[test]
    fn test_grands_prix_in_year() {
        let mut warnings = Warnings::new();
        let names = grands_prix_in_year(&dataset(), 2011, &mut warnings).unwrap();
        assert_eq!(names, vec!["British Grand Prix", "Monaco Grand Prix"]);
    }

    #[test]
    fn test_race_id_lookup() {
        let ds = dataset();
        let mut warnings = Warnings::new();
        assert_eq!(race_id(&ds, 2011, "Monaco Grand Prix", &mut warnings).unwrap(), 4);
        let err = race_id(&ds, 2011, "Bahrain Grand Prix", &mut warnings).unwrap_err();
        assert!(err.is_resolution());
        let err = race_id(&ds, 2011, "Moon Grand Prix", &mut warnings).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: EntityKind::GrandPrix, .. }));
    }

    #[test]
    fn test_available_sessions() {
        let ds = dataset();
        assert_eq!(
            available_sessions(&ds, 2).unwrap(),
            vec![Session::Race, Session::Qualifying]
        );
        assert_eq!(available_sessions(&ds, 5).unwrap(), vec![Session::Race]);
        assert!(available_sessions(&ds, 99).unwrap().is_empty());
    }

    #[test]
    fn test_race_classification() {
        let mut warnings = Warnings::new();
        let rows = session_classification(&dataset(), Session::Race, 2, &mut warnings).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].driver, "Sebastian Vettel");
        assert_eq!(rows[0].team, "Red Bull");
        assert_eq!(rows[0].time_or_gap.as_deref(), Some("1:50:13.355"));
        assert_eq!(rows[1].time_or_gap.as_deref(), Some("+0.448"));
        assert_eq!(rows[3].position_text.as_deref(), Some("DSQ"));
        assert_eq!(rows[3].position, None);
        assert_eq!(rows[3].driver, "Mystery Driver");
    }

    #[test]
    fn test_qualifying_shows_times() {
        let mut warnings = Warnings::new();
        let rows =
            session_classification(&dataset(), Session::Qualifying, 2, &mut warnings).unwrap();
        assert_eq!(rows[1].time_or_gap.as_deref(), Some("1:14.000"));
        assert_eq!(rows[1].laps, None);
    }

    #[test]
    fn test_pit_stop_summary() {
        let mut warnings = Warnings::new();
        let summary = pit_stop_summary(&dataset(), 2, &mut warnings).unwrap();
        assert_eq!(
            summary,
            vec![
                PitStopSummary {
                    driver: "Fernando Alonso".to_string(),
                    mean_seconds: 21.0,
                    stops: Some(1)
                },
                PitStopSummary {
                    driver: "Sebastian Vettel".to_string(),
                    mean_seconds: 23.0,
                    stops: Some(2)
                },
            ]
        );
    }

    #[test]
    fn test_pit_stops_missing_table() {
        let ds = crate::dataset::Dataset::from_batches([(
            Table::Drivers,
            crate::testing::drivers(),
        )]);
        let mut warnings = Warnings::new();
        assert!(pit_stop_summary(&ds, 2, &mut warnings).unwrap().is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
