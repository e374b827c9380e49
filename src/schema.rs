//! Table catalog: file names and declared column types for every table.
//!
//! Declared columns are always present in a loaded batch with their declared
//! type (missing ones are filled with nulls); anything else in the file is
//! carried along as text.

use std::fmt;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};

/// Logical column type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Int,
    Float,
    Date,
}

impl ColumnType {
    pub fn data_type(self) -> DataType {
        match self {
            ColumnType::Text => DataType::Utf8,
            ColumnType::Int => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::Date => DataType::Date32,
        }
    }
}

use ColumnType::{Date, Float, Int, Text};

const DRIVERS: &[(&str, ColumnType)] = &[
    ("id", Text),
    ("name", Text),
    ("fullName", Text),
    ("permanentNumber", Int),
    ("dateOfBirth", Date),
    ("dateOfDeath", Date),
    ("placeOfBirth", Text),
    ("countryOfBirthCountryId", Text),
    ("nationalityCountryId", Text),
    ("totalChampionshipWins", Int),
    ("totalRaceWins", Int),
    ("totalPodiums", Int),
    ("totalPolePositions", Int),
    ("totalRaceStarts", Int),
];

const CONSTRUCTORS: &[(&str, ColumnType)] = &[
    ("id", Text),
    ("name", Text),
    ("fullName", Text),
    ("countryId", Text),
    ("totalChampionshipWins", Int),
    ("totalRaceWins", Int),
    ("totalPodiums", Int),
    ("totalPolePositions", Int),
    ("total1And2Finishes", Int),
    ("totalRaceStarts", Int),
];

const COUNTRIES: &[(&str, ColumnType)] = &[("id", Text), ("name", Text), ("alpha3Code", Text)];

const RACES: &[(&str, ColumnType)] = &[
    ("raceId", Int),
    ("year", Int),
    ("round", Int),
    ("grandPrixId", Text),
    ("circuitId", Text),
];

const GRANDS_PRIX: &[(&str, ColumnType)] = &[
    ("id", Text),
    ("name", Text),
    ("fullName", Text),
    ("countryId", Text),
];

const CIRCUITS: &[(&str, ColumnType)] = &[
    ("id", Text),
    ("name", Text),
    ("fullName", Text),
    ("placeName", Text),
    ("countryId", Text),
    ("latitude", Float),
    ("longitude", Float),
];

const SESSION_RESULTS: &[(&str, ColumnType)] = &[
    ("raceId", Int),
    ("year", Int),
    ("positionNumber", Int),
    ("positionText", Text),
    ("driverNumber", Int),
    ("driverId", Text),
    ("constructorId", Text),
    ("time", Text),
    ("gap", Text),
    ("laps", Int),
    ("points", Float),
    ("gridPositionNumber", Int),
];

const PIT_STOPS: &[(&str, ColumnType)] = &[
    ("raceId", Int),
    ("year", Int),
    ("driverId", Text),
    ("constructorId", Text),
    ("stop", Int),
    ("lap", Int),
    ("time", Text),
];

const DRIVER_STANDINGS: &[(&str, ColumnType)] = &[
    ("year", Int),
    ("positionNumber", Int),
    ("driverId", Text),
    ("points", Float),
];

const CONSTRUCTOR_STANDINGS: &[(&str, ColumnType)] = &[
    ("year", Int),
    ("positionNumber", Int),
    ("constructorId", Text),
    ("points", Float),
];

const SEASON_DRIVERS: &[(&str, ColumnType)] = &[
    ("year", Int),
    ("driverId", Text),
    ("totalPoints", Float),
    ("totalRaceWins", Int),
    ("totalPodiums", Int),
    ("totalPolePositions", Int),
    ("totalRaceStarts", Int),
];

const SEASON_CONSTRUCTORS: &[(&str, ColumnType)] = &[
    ("year", Int),
    ("constructorId", Text),
    ("totalPoints", Float),
    ("totalRaceWins", Int),
    ("totalPodiums", Int),
    ("totalPolePositions", Int),
    ("totalRaceStarts", Int),
];

/// Symbolic identifier of a dataset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Drivers,
    Constructors,
    Countries,
    Races,
    GrandsPrix,
    Circuits,
    RaceResults,
    QualifyingResults,
    SprintRaceResults,
    SprintQualifyingResults,
    FreePractice1Results,
    FreePractice2Results,
    FreePractice3Results,
    PitStops,
    DriverStandings,
    ConstructorStandings,
    SeasonDrivers,
    SeasonConstructors,
}

impl Table {
    pub const ALL: [Table; 18] = [
        Table::Drivers,
        Table::Constructors,
        Table::Countries,
        Table::Races,
        Table::GrandsPrix,
        Table::Circuits,
        Table::RaceResults,
        Table::QualifyingResults,
        Table::SprintRaceResults,
        Table::SprintQualifyingResults,
        Table::FreePractice1Results,
        Table::FreePractice2Results,
        Table::FreePractice3Results,
        Table::PitStops,
        Table::DriverStandings,
        Table::ConstructorStandings,
        Table::SeasonDrivers,
        Table::SeasonConstructors,
    ];

    /// Short name used in file names, logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Table::Drivers => "drivers",
            Table::Constructors => "constructors",
            Table::Countries => "countries",
            Table::Races => "races",
            Table::GrandsPrix => "grands-prix",
            Table::Circuits => "circuits",
            Table::RaceResults => "races-race-results",
            Table::QualifyingResults => "races-qualifying-results",
            Table::SprintRaceResults => "races-sprint-race-results",
            Table::SprintQualifyingResults => "races-sprint-qualifying-results",
            Table::FreePractice1Results => "races-free-practice-1-results",
            Table::FreePractice2Results => "races-free-practice-2-results",
            Table::FreePractice3Results => "races-free-practice-3-results",
            Table::PitStops => "races-pit-stops",
            Table::DriverStandings => "seasons-driver-standings",
            Table::ConstructorStandings => "seasons-constructor-standings",
            Table::SeasonDrivers => "seasons-drivers",
            Table::SeasonConstructors => "seasons-constructors",
        }
    }

    /// File stem without extension, e.g. `f1db-races`.
    pub fn file_stem(self) -> String {
        format!("f1db-{}", self.name())
    }

    pub fn columns(self) -> &'static [(&'static str, ColumnType)] {
        match self {
            Table::Drivers => DRIVERS,
            Table::Constructors => CONSTRUCTORS,
            Table::Countries => COUNTRIES,
            Table::Races => RACES,
            Table::GrandsPrix => GRANDS_PRIX,
            Table::Circuits => CIRCUITS,
            Table::RaceResults
            | Table::QualifyingResults
            | Table::SprintRaceResults
            | Table::SprintQualifyingResults
            | Table::FreePractice1Results
            | Table::FreePractice2Results
            | Table::FreePractice3Results => SESSION_RESULTS,
            Table::PitStops => PIT_STOPS,
            Table::DriverStandings => DRIVER_STANDINGS,
            Table::ConstructorStandings => CONSTRUCTOR_STANDINGS,
            Table::SeasonDrivers => SEASON_DRIVERS,
            Table::SeasonConstructors => SEASON_CONSTRUCTORS,
        }
    }

    pub fn column_type(self, column: &str) -> Option<ColumnType> {
        self.columns()
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, ty)| *ty)
    }

    /// Arrow schema of the declared columns, all nullable.
    pub fn schema(self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns()
            .iter()
            .map(|(name, ty)| Field::new(*name, ty.data_type(), true))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A timed session of a race weekend with its own results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Session {
    Race,
    Qualifying,
    SprintRace,
    SprintQualifying,
    FreePractice1,
    FreePractice2,
    FreePractice3,
}

impl Session {
    pub const ALL: [Session; 7] = [
        Session::Race,
        Session::Qualifying,
        Session::SprintRace,
        Session::SprintQualifying,
        Session::FreePractice1,
        Session::FreePractice2,
        Session::FreePractice3,
    ];

    pub fn table(self) -> Table {
        match self {
            Session::Race => Table::RaceResults,
            Session::Qualifying => Table::QualifyingResults,
            Session::SprintRace => Table::SprintRaceResults,
            Session::SprintQualifying => Table::SprintQualifyingResults,
            Session::FreePractice1 => Table::FreePractice1Results,
            Session::FreePractice2 => Table::FreePractice2Results,
            Session::FreePractice3 => Table::FreePractice3Results,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Session::Race => "Race",
            Session::Qualifying => "Qualifying",
            Session::SprintRace => "Sprint Race",
            Session::SprintQualifying => "Sprint Qualifying",
            Session::FreePractice1 => "Free Practice 1",
            Session::FreePractice2 => "Free Practice 2",
            Session::FreePractice3 => "Free Practice 3",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
