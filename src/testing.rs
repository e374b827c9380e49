//! Small in-memory slice of the dataset used by the unit tests.

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};

use crate::dataset::Dataset;
use crate::reader::coerce;
use crate::schema::Table;

/// Build a table from unquoted comma-separated text; empty cells are null.
pub fn table(table: Table, text: &str) -> RecordBatch {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let rows: Vec<Vec<&str>> = lines.map(|l| l.split(',').collect()).collect();

    let columns: Vec<ArrayRef> = (0..header.len())
        .map(|i| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|r| r.get(i).copied().filter(|v| !v.is_empty()))
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();
    let fields: Vec<Field> = header
        .iter()
        .map(|h| Field::new(*h, DataType::Utf8, true))
        .collect();
    let raw = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();
    coerce(table, &raw).unwrap()
}

pub fn countries() -> RecordBatch {
    table(
        Table::Countries,
        "id,name,alpha3Code
         united-kingdom,United Kingdom,GBR
         spain,Spain,ESP
         germany,Germany,DEU
         netherlands,Netherlands,NLD
         monaco,Monaco,MCO
         bahrain,Bahrain,BHR
         austria,Austria,AUT
         italy,Italy,ITA",
    )
}

pub fn drivers() -> RecordBatch {
    table(
        Table::Drivers,
        "id,name,fullName,permanentNumber,dateOfBirth,dateOfDeath,placeOfBirth,countryOfBirthCountryId,nationalityCountryId,totalChampionshipWins,totalRaceWins,totalPodiums,totalPolePositions,totalRaceStarts
         lewis-hamilton,Lewis Hamilton,Lewis Carl Davidson Hamilton,44,1985-01-07,,Stevenage,united-kingdom,united-kingdom,7,105,202,104,356
         fernando-alonso,Fernando Alonso,Fernando Alonso Díaz,14,1981-07-29,,Oviedo,spain,spain,2,32,106,22,404
         sebastian-vettel,Sebastian Vettel,Sebastian Vettel,5,1987-07-03,,Heppenheim,germany,germany,4,53,122,57,299
         max-verstappen,Max Verstappen,Max Emilian Verstappen,1,1997-09-30,,Hasselt,belgium,netherlands,4,63,112,40,209
         mystery-driver,Mystery Driver,Mystery Driver,,,,,,atlantis,0,0,0,0,1",
    )
}

pub fn constructors() -> RecordBatch {
    table(
        Table::Constructors,
        "id,name,fullName,countryId,totalChampionshipWins,totalRaceWins,totalPodiums,totalPolePositions,total1And2Finishes,totalRaceStarts
         mercedes,Mercedes,Mercedes-AMG Petronas F1 Team,germany,8,125,300,130,60,300
         red-bull,Red Bull,Red Bull Racing,austria,6,120,280,100,40,390
         ferrari,Ferrari,Scuderia Ferrari,italy,16,245,800,250,85,1100",
    )
}

pub fn grands_prix() -> RecordBatch {
    table(
        Table::GrandsPrix,
        "id,name,fullName,countryId
         bahrain,Bahrain,Bahrain Grand Prix,bahrain
         monaco,Monaco,Monaco Grand Prix,monaco
         great-britain,Great Britain,British Grand Prix,united-kingdom
         europe,Europe,European Grand Prix,",
    )
}

pub fn circuits() -> RecordBatch {
    table(
        Table::Circuits,
        "id,name,fullName,placeName,countryId,latitude,longitude
         bahrain,Bahrain,Bahrain International Circuit,Sakhir,bahrain,26.0325,50.5106
         monaco,Monaco,Circuit de Monaco,Monte Carlo,monaco,43.7347,7.4206
         silverstone,Silverstone,Silverstone Circuit,Silverstone,united-kingdom,52.0786,-1.0169
         valencia,Valencia,Valencia Street Circuit,Valencia,spain,39.4589,-0.3317",
    )
}

pub fn races() -> RecordBatch {
    table(
        Table::Races,
        "raceId,year,round,grandPrixId,circuitId
         1,2010,1,bahrain,bahrain
         2,2010,2,monaco,monaco
         3,2010,3,europe,valencia
         4,2011,1,monaco,monaco
         5,2011,2,great-britain,silverstone",
    )
}

/// Race results. Wins: Alonso races 1 and 5, Vettel races 2, 3 and 4.
const RACE_RESULTS: &str = "raceId,year,positionNumber,positionText,driverNumber,driverId,constructorId,time,gap,laps,points,gridPositionNumber
         1,2010,1,1,8,fernando-alonso,ferrari,1:39:20.396,,49,25,3
         1,2010,2,2,5,sebastian-vettel,red-bull,,+16.099,49,18,1
         1,2010,,Ret,1,lewis-hamilton,mercedes,,,30,0,4
         2,2010,1,1,5,sebastian-vettel,red-bull,1:50:13.355,,78,25,1
         2,2010,2,2,8,fernando-alonso,ferrari,,+0.448,78,18,2
         2,2010,3,3,1,lewis-hamilton,mercedes,,+1.675,78,15,5
         2,2010,,DSQ,99,mystery-driver,ferrari,,,78,0,20
         3,2010,1,1,5,sebastian-vettel,red-bull,1:40:29.571,,57,25,1
         3,2010,2,2,1,lewis-hamilton,mercedes,,+5.042,57,18,3
         4,2011,1,1,5,sebastian-vettel,red-bull,1:46:06.557,,78,25,1
         4,2011,2,2,14,fernando-alonso,ferrari,,+1.138,78,18,4
         4,2011,4,4,44,lewis-hamilton,mercedes,,+20.000,78,12,2
         5,2011,1,1,14,fernando-alonso,ferrari,1:28:41.196,,52,25,3
         5,2011,2,2,5,sebastian-vettel,red-bull,,+16.511,52,18,1
         5,2011,,Ret,44,lewis-hamilton,mercedes,,,40,0,2";

pub fn race_results() -> RecordBatch {
    table(Table::RaceResults, RACE_RESULTS)
}

/// Race results plus a shared Monaco 2011 win by `ghost-driver`, who is not in
/// `drivers()`.
pub fn race_results_with_unknown_driver() -> RecordBatch {
    let text = format!("{RACE_RESULTS}\n4,2011,1,1,77,ghost-driver,ferrari,1:46:06.557,,78,25,6");
    table(Table::RaceResults, &text)
}

pub fn qualifying_results() -> RecordBatch {
    table(
        Table::QualifyingResults,
        "raceId,year,positionNumber,positionText,driverNumber,driverId,constructorId,time
         2,2010,1,1,5,sebastian-vettel,red-bull,1:13.826
         2,2010,2,2,8,fernando-alonso,ferrari,1:14.000",
    )
}

pub fn pit_stops() -> RecordBatch {
    table(
        Table::PitStops,
        "raceId,year,driverId,constructorId,stop,lap,time
         2,2010,sebastian-vettel,red-bull,1,20,22.5
         2,2010,sebastian-vettel,red-bull,2,50,23.5
         2,2010,fernando-alonso,ferrari,1,22,21.0
         2,2010,lewis-hamilton,mercedes,1,25,bad
         4,2011,fernando-alonso,ferrari,1,30,24.0",
    )
}

pub fn driver_standings() -> RecordBatch {
    table(
        Table::DriverStandings,
        "year,positionNumber,driverId,points
         2010,1,sebastian-vettel,256
         2010,2,fernando-alonso,252
         2010,4,lewis-hamilton,240
         2011,1,sebastian-vettel,392
         2011,4,fernando-alonso,257
         2011,5,lewis-hamilton,227",
    )
}

pub fn constructor_standings() -> RecordBatch {
    table(
        Table::ConstructorStandings,
        "year,positionNumber,constructorId,points
         2010,1,red-bull,498
         2010,3,ferrari,396
         2011,1,red-bull,650
         2011,2,mercedes,497
         2011,3,ferrari,375",
    )
}

pub fn season_drivers() -> RecordBatch {
    table(
        Table::SeasonDrivers,
        "year,driverId,totalPoints,totalRaceWins,totalPodiums,totalPolePositions,totalRaceStarts
         2010,sebastian-vettel,256,5,10,10,19
         2011,sebastian-vettel,392,11,17,15,19
         2010,fernando-alonso,252,5,10,2,19
         2011,fernando-alonso,257,1,10,0,19
         2010,lewis-hamilton,240,3,9,1,19",
    )
}

pub fn season_constructors() -> RecordBatch {
    table(
        Table::SeasonConstructors,
        "year,constructorId,totalPoints,totalRaceWins,totalPodiums,totalPolePositions,totalRaceStarts
         2010,red-bull,498,9,20,15,19
         2011,red-bull,650,12,27,18,19
         2010,ferrari,396,5,12,2,19",
    )
}

/// Every fixture table; sprint and practice sessions are absent.
pub fn dataset() -> Dataset {
    dataset_with_results(race_results())
}

pub fn dataset_with_results(results: RecordBatch) -> Dataset {
    Dataset::from_batches([
        (Table::Countries, countries()),
        (Table::Drivers, drivers()),
        (Table::Constructors, constructors()),
        (Table::GrandsPrix, grands_prix()),
        (Table::Circuits, circuits()),
        (Table::Races, races()),
        (Table::RaceResults, results),
        (Table::QualifyingResults, qualifying_results()),
        (Table::PitStops, pit_stops()),
        (Table::DriverStandings, driver_standings()),
        (Table::ConstructorStandings, constructor_standings()),
        (Table::SeasonDrivers, season_drivers()),
        (Table::SeasonConstructors, season_constructors()),
    ])
}
