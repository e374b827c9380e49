//! Per-grand-prix history: who wins it, where it is held, and how driver
//! nationalities fare there.

use arrow::array::{Array, RecordBatch};

use crate::aggregator::{Aggregation, GroupValue};
use crate::dataset::{Dataset, Warnings};
use crate::error::Result;
use crate::filter::{apply_filter, Predicate};
use crate::join::{enrich, JoinSpec};
use crate::query::{
    alpha3_by_country_name, session_with_names, to_country_values, CountryValue, COUNTRY_NAME,
    DRIVER_NAME, TEAM_NAME,
};
use crate::resolver::EntityKind;
use crate::schema::Table;
use crate::utils::{distinct_strings, get_f64_column, get_i64_column, get_str_column};

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitInfo {
    pub id: String,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub place_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrandPrixOverview {
    pub id: String,
    pub name: String,
    pub times_held: usize,
    /// Most-winning driver and their win count.
    pub top_driver: Option<(String, u64)>,
    pub top_team: Option<(String, u64)>,
    pub circuits: Vec<CircuitInfo>,
    /// Set only when every circuit used lies in the same country.
    pub alpha3: Option<String>,
}

/// Result metric shown on the nationality map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NationalityMetric {
    Victories,
    Podiums,
    Poles,
    Points,
}

/// Races of a grand prix, resolved from its full name.
fn races_of(ds: &Dataset, name: &str, warnings: &mut Warnings) -> Result<(String, RecordBatch)> {
    let resolver = ds.resolver(EntityKind::GrandPrix, warnings)?;
    let gp_id = resolver.resolve_name_to_id(name)?.to_string();
    let races = ds.load_or_warn(Table::Races, warnings);
    let held = apply_filter(&races, &[Predicate::equals("grandPrixId", gp_id.as_str())])?;
    Ok((gp_id, held))
}

fn race_ids(races: &RecordBatch) -> Result<Vec<i64>> {
    Ok(get_i64_column(races, "raceId")?.iter().flatten().collect())
}

fn top(groups: Vec<GroupValue>) -> Option<(String, u64)> {
    groups
        .into_iter()
        .next()
        .map(|g| (g.key.to_string(), g.value as u64))
}

pub fn overview(ds: &Dataset, name: &str, warnings: &mut Warnings) -> Result<GrandPrixOverview> {
    let (id, held) = races_of(ds, name, warnings)?;
    let ids = race_ids(&held)?;

    let results = session_with_names(ds, Table::RaceResults, warnings)?;
    let results = apply_filter(&results, &[Predicate::in_set("raceId", ids.iter().copied())])?;
    let top_driver = top(Aggregation::count(DRIVER_NAME).filter(Predicate::win()).run(&results)?);
    let top_team = top(Aggregation::count(TEAM_NAME).filter(Predicate::win()).run(&results)?);

    let circuit_ids = distinct_strings(&held, "circuitId")?;
    let circuits = ds.load_or_warn(Table::Circuits, warnings);
    let used = apply_filter(&circuits, &[Predicate::in_set("id", circuit_ids)])?;
    let countries = distinct_strings(&used, "countryId")?;
    let alpha3 = match countries.as_slice() {
        [country] => {
            let resolver = ds.resolver(EntityKind::Country, warnings)?;
            resolver.attribute(country, "alpha3Code").ok().flatten()
        }
        _ => None,
    };

    Ok(GrandPrixOverview {
        id,
        name: name.to_string(),
        times_held: ids.len(),
        top_driver,
        top_team,
        circuits: circuit_rows(&used)?,
        alpha3,
    })
}

fn circuit_rows(circuits: &RecordBatch) -> Result<Vec<CircuitInfo>> {
    let ids = get_str_column(circuits, "id")?;
    let names = get_str_column(circuits, "name")?;
    let full_names = get_str_column(circuits, "fullName")?;
    let places = get_str_column(circuits, "placeName")?;
    let latitude = get_f64_column(circuits, "latitude")?;
    let longitude = get_f64_column(circuits, "longitude")?;

    let text = |col: &arrow::array::StringArray, row: usize| {
        (!col.is_null(row)).then(|| col.value(row).to_string())
    };
    Ok((0..circuits.num_rows())
        .filter(|&row| !ids.is_null(row))
        .map(|row| CircuitInfo {
            id: ids.value(row).to_string(),
            name: text(&names, row),
            full_name: text(&full_names, row),
            place_name: text(&places, row),
            latitude: (!latitude.is_null(row)).then(|| latitude.value(row)),
            longitude: (!longitude.is_null(row)).then(|| longitude.value(row)),
        })
        .collect())
}

/// Metric per driver nationality over every edition of the grand prix.
/// Drivers whose nationality does not resolve to a country are left out.
pub fn nationality_metric(
    ds: &Dataset,
    name: &str,
    metric: NationalityMetric,
    warnings: &mut Warnings,
) -> Result<Vec<CountryValue>> {
    let (_, held) = races_of(ds, name, warnings)?;
    let ids = race_ids(&held)?;

    let results = ds.load_or_warn(Table::RaceResults, warnings);
    let drivers = ds.load_or_warn(Table::Drivers, warnings);
    let countries = ds.load_or_warn(Table::Countries, warnings);
    let in_gp = apply_filter(&results, &[Predicate::in_set("raceId", ids)])?;
    let rows = enrich(
        &in_gp,
        &[
            JoinSpec::new("drivers", &drivers, "driverId", "id").attach("nationalityCountryId"),
            JoinSpec::new("countries", &countries, "nationalityCountryId", "id")
                .attach_as("name", COUNTRY_NAME),
        ],
    )?;

    let aggregation = match metric {
        NationalityMetric::Victories => Aggregation::count(COUNTRY_NAME).filter(Predicate::win()),
        NationalityMetric::Podiums => Aggregation::count(COUNTRY_NAME).filter(Predicate::podium()),
        NationalityMetric::Poles => Aggregation::count(COUNTRY_NAME).filter(Predicate::pole()),
        NationalityMetric::Points => Aggregation::sum(COUNTRY_NAME, "points").keep_above(0.0),
    };
    let groups = aggregation.run(&rows)?;
    let alpha3 = alpha3_by_country_name(ds, warnings)?;
    Ok(to_country_values(groups, &alpha3))
}
