//! Dashboard views built from the pipeline stages.
//!
//! Every view takes the shared [`Dataset`] plus a [`Warnings`] sink. Missing
//! tables degrade to empty results and leave a warning behind; only a bad
//! column reference is returned as an error.

pub mod geography;
pub mod grand_prix;
pub mod profile;
pub mod results;
pub mod season;
pub mod summary;

use std::collections::HashMap;

use arrow::array::{Array, RecordBatch};

use crate::aggregator::GroupValue;
use crate::dataset::{Dataset, Warnings};
use crate::error::Result;
use crate::join::{enrich, JoinSpec};
use crate::schema::Table;
use crate::utils::get_str_column;

pub const DRIVER_NAME: &str = "driverName";
pub const TEAM_NAME: &str = "teamName";
pub const GRAND_PRIX_NAME: &str = "grandPrixName";
pub const COUNTRY_NAME: &str = "countryName";

/// Which reference entity a view is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Drivers,
    Constructors,
}

impl Scope {
    /// Id column of the entity in fact tables.
    pub fn fact_key(self) -> &'static str {
        match self {
            Scope::Drivers => "driverId",
            Scope::Constructors => "constructorId",
        }
    }

    pub fn table(self) -> Table {
        match self {
            Scope::Drivers => Table::Drivers,
            Scope::Constructors => Table::Constructors,
        }
    }

    pub fn season_table(self) -> Table {
        match self {
            Scope::Drivers => Table::SeasonDrivers,
            Scope::Constructors => Table::SeasonConstructors,
        }
    }

    pub fn standings_table(self) -> Table {
        match self {
            Scope::Drivers => Table::DriverStandings,
            Scope::Constructors => Table::ConstructorStandings,
        }
    }

    /// Column of the reference row pointing at the entity's country.
    pub fn country_key(self) -> &'static str {
        match self {
            Scope::Drivers => "nationalityCountryId",
            Scope::Constructors => "countryId",
        }
    }
}

/// A country-keyed value ready for a choropleth.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryValue {
    pub country: String,
    pub alpha3: Option<String>,
    pub value: f64,
}

/// Session results with the canonical driver and team names attached.
pub fn session_with_names(
    ds: &Dataset,
    table: Table,
    warnings: &mut Warnings,
) -> Result<RecordBatch> {
    let rows = ds.load_or_warn(table, warnings);
    let drivers = ds.load_or_warn(Table::Drivers, warnings);
    let constructors = ds.load_or_warn(Table::Constructors, warnings);
    enrich(
        &rows,
        &[
            JoinSpec::new("drivers", &drivers, "driverId", "id").attach_as("name", DRIVER_NAME),
            JoinSpec::new("constructors", &constructors, "constructorId", "id")
                .attach_as("name", TEAM_NAME),
        ],
    )
}

/// Attach grand prix id and name, and the grand prix country, through the
/// race each row belongs to.
pub fn with_race_context(
    rows: &RecordBatch,
    ds: &Dataset,
    warnings: &mut Warnings,
) -> Result<RecordBatch> {
    let races = ds.load_or_warn(Table::Races, warnings);
    let grands_prix = ds.load_or_warn(Table::GrandsPrix, warnings);
    let countries = ds.load_or_warn(Table::Countries, warnings);
    enrich(
        rows,
        &[
            JoinSpec::new("races", &races, "raceId", "raceId").attach("grandPrixId"),
            JoinSpec::new("grands-prix", &grands_prix, "grandPrixId", "id")
                .attach_as("fullName", GRAND_PRIX_NAME)
                .attach_as("countryId", "grandPrixCountryId"),
            JoinSpec::new("countries", &countries, "grandPrixCountryId", "id")
                .attach_as("name", COUNTRY_NAME),
        ],
    )
}

/// Country name to ISO alpha-3 code.
pub fn alpha3_by_country_name(
    ds: &Dataset,
    warnings: &mut Warnings,
) -> Result<HashMap<String, String>> {
    let countries = ds.load_or_warn(Table::Countries, warnings);
    let names = get_str_column(&countries, "name")?;
    let codes = get_str_column(&countries, "alpha3Code")?;
    Ok((0..countries.num_rows())
        .filter(|&row| !names.is_null(row) && !codes.is_null(row))
        .map(|row| (names.value(row).to_string(), codes.value(row).to_string()))
        .collect())
}

pub(crate) fn to_country_values(
    groups: Vec<GroupValue>,
    alpha3: &HashMap<String, String>,
) -> Vec<CountryValue> {
    groups
        .into_iter()
        .map(|g| {
            let country = g.key.to_string();
            CountryValue {
                alpha3: alpha3.get(&country).cloned(),
                country,
                value: g.value,
            }
        })
        .collect()
}
