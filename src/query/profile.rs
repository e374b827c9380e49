//! Driver and team profiles.

use std::collections::BTreeSet;

use arrow::array::Array;

use crate::aggregator::{column_total, Aggregation, GroupOrder, GroupValue};
use crate::dataset::{Dataset, Warnings};
use crate::error::Result;
use crate::filter::{apply_filter, count_matching_rows, Predicate};
use crate::query::{
    alpha3_by_country_name, to_country_values, with_race_context, CountryValue, Scope, COUNTRY_NAME,
};
use crate::resolver::{EntityKind, EntityResolver};
use crate::schema::Table;
use crate::utils::get_str_column;

#[derive(Debug, Clone, PartialEq)]
pub struct DriverProfile {
    pub id: String,
    pub name: String,
    pub full_name: Option<String>,
    /// ISO date, `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    pub place_of_birth: Option<String>,
    pub country_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub nationality: Option<String>,
    pub permanent_number: Option<i64>,
    pub championships: usize,
    /// Season totals summed over the career.
    pub wins: i64,
    pub podiums: i64,
    pub poles: i64,
    pub starts: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamProfile {
    pub id: String,
    pub name: String,
    pub full_name: Option<String>,
    pub country: Option<String>,
    pub championships: usize,
    pub wins: Option<i64>,
    pub podiums: Option<i64>,
    pub poles: Option<i64>,
    pub one_two_finishes: Option<i64>,
    pub starts: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reliability {
    pub finished: usize,
    pub not_finished: usize,
}

/// Per-season series plotted on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonMetric {
    Points,
    Wins,
    Podiums,
    Poles,
}

impl SeasonMetric {
    pub fn column(self) -> &'static str {
        match self {
            SeasonMetric::Points => "totalPoints",
            SeasonMetric::Wins => "totalRaceWins",
            SeasonMetric::Podiums => "totalPodiums",
            SeasonMetric::Poles => "totalPolePositions",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WinsByCountry {
    pub countries: Vec<CountryValue>,
    /// Grands prix with wins whose country is not mapped.
    pub unmapped_grands_prix: Vec<String>,
}

fn int_attribute(resolver: &EntityResolver, id: &str, column: &str) -> Result<Option<i64>> {
    Ok(resolver
        .attribute(id, column)?
        .and_then(|v| v.trim().parse().ok()))
}

fn country_name(countries: &EntityResolver, country_id: Option<String>) -> Option<String> {
    country_id.and_then(|id| countries.id_to_display(&id).map(str::to_string))
}

/// Seasons finished first in the standings.
fn championships(ds: &Dataset, scope: Scope, id: &str, warnings: &mut Warnings) -> Result<usize> {
    let standings = ds.load_or_warn(scope.standings_table(), warnings);
    count_matching_rows(
        &standings,
        &[Predicate::equals(scope.fact_key(), id), Predicate::equals("positionNumber", 1i64)],
    )
}

pub fn driver_profile(ds: &Dataset, name: &str, warnings: &mut Warnings) -> Result<DriverProfile> {
    let drivers = ds.resolver(EntityKind::Driver, warnings)?;
    let countries = ds.resolver(EntityKind::Country, warnings)?;
    let id = drivers.resolve_name_to_id(name)?.to_string();

    let seasons = ds.load_or_warn(Table::SeasonDrivers, warnings);
    let career = apply_filter(&seasons, &[Predicate::equals("driverId", id.as_str())])?;
    let total = |column: &str| -> Result<i64> { Ok(column_total(&career, column)? as i64) };

    Ok(DriverProfile {
        name: drivers.display_or_unknown(&id).to_string(),
        full_name: drivers.attribute(&id, "fullName")?,
        date_of_birth: drivers.attribute(&id, "dateOfBirth")?,
        place_of_birth: drivers.attribute(&id, "placeOfBirth")?,
        country_of_birth: country_name(
            &countries,
            drivers.attribute(&id, "countryOfBirthCountryId")?,
        ),
        date_of_death: drivers.attribute(&id, "dateOfDeath")?,
        nationality: country_name(&countries, drivers.attribute(&id, "nationalityCountryId")?),
        permanent_number: int_attribute(&drivers, &id, "permanentNumber")?,
        championships: championships(ds, Scope::Drivers, &id, warnings)?,
        wins: total("totalRaceWins")?,
        podiums: total("totalPodiums")?,
        poles: total("totalPolePositions")?,
        starts: total("totalRaceStarts")?,
        id,
    })
}

/// Team details; career totals come straight from the constructor row.
pub fn team_profile(ds: &Dataset, name: &str, warnings: &mut Warnings) -> Result<TeamProfile> {
    let teams = ds.resolver(EntityKind::Constructor, warnings)?;
    let countries = ds.resolver(EntityKind::Country, warnings)?;
    let id = teams.resolve_name_to_id(name)?.to_string();

    Ok(TeamProfile {
        name: teams.display_or_unknown(&id).to_string(),
        full_name: teams.attribute(&id, "fullName")?,
        country: country_name(&countries, teams.attribute(&id, "countryId")?),
        championships: championships(ds, Scope::Constructors, &id, warnings)?,
        wins: int_attribute(&teams, &id, "totalRaceWins")?,
        podiums: int_attribute(&teams, &id, "totalPodiums")?,
        poles: int_attribute(&teams, &id, "totalPolePositions")?,
        one_two_finishes: int_attribute(&teams, &id, "total1And2Finishes")?,
        starts: int_attribute(&teams, &id, "totalRaceStarts")?,
        id,
    })
}

/// Finished against non-finished race results.
pub fn reliability(
    ds: &Dataset,
    scope: Scope,
    id: &str,
    warnings: &mut Warnings,
) -> Result<Reliability> {
    let results = ds.load_or_warn(Table::RaceResults, warnings);
    let own = apply_filter(&results, &[Predicate::equals(scope.fact_key(), id)])?;
    let finished = count_matching_rows(&own, &[Predicate::finished()])?;
    Ok(Reliability {
        finished,
        not_finished: own.num_rows() - finished,
    })
}

/// One value per season, in chronological order.
pub fn season_series(
    ds: &Dataset,
    scope: Scope,
    id: &str,
    metric: SeasonMetric,
    warnings: &mut Warnings,
) -> Result<Vec<GroupValue>> {
    let seasons = ds.load_or_warn(scope.season_table(), warnings);
    Aggregation::sum("year", metric.column())
        .filter(Predicate::equals(scope.fact_key(), id))
        .order(GroupOrder::KeyAscending)
        .run(&seasons)
}

/// Race wins by the country of the grand prix, via race, grand prix and
/// country joins.
pub fn wins_by_country(
    ds: &Dataset,
    scope: Scope,
    id: &str,
    warnings: &mut Warnings,
) -> Result<WinsByCountry> {
    let results = ds.load_or_warn(Table::RaceResults, warnings);
    let wins = apply_filter(
        &results,
        &[Predicate::equals(scope.fact_key(), id), Predicate::win()],
    )?;
    let wins = with_race_context(&wins, ds, warnings)?;

    let grands_prix = get_str_column(&wins, "grandPrixId")?;
    let countries = get_str_column(&wins, COUNTRY_NAME)?;
    let unmapped: BTreeSet<&str> = (0..wins.num_rows())
        .filter(|&row| countries.is_null(row) && !grands_prix.is_null(row))
        .map(|row| grands_prix.value(row))
        .collect();

    let groups = Aggregation::count(COUNTRY_NAME).run(&wins)?;
    let alpha3 = alpha3_by_country_name(ds, warnings)?;
    Ok(WinsByCountry {
        countries: to_country_values(groups, &alpha3),
        unmapped_grands_prix: unmapped.into_iter().map(str::to_string).collect(),
    })
}
