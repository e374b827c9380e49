//! CSV and Parquet readers with best-effort type coercion
//!
//! CSV files are read with every column as text, then declared columns are
//! cast to their declared type with the safe cast kernel: a value that does
//! not parse becomes null instead of failing the load.

use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{new_null_array, ArrayRef, RecordBatch};
use arrow::compute::{cast, concat_batches};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::Table;

/// Rows per decoded batch; batches are concatenated after reading.
const BATCH_SIZE: usize = 8192;

/// Where a table's data lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Csv(PathBuf),
    Parquet(PathBuf),
}

impl TableSource {
    /// Find the backing file for `table` under `root`, preferring Parquet.
    pub fn locate(root: &Path, table: Table) -> Option<TableSource> {
        let stem = table.file_stem();
        let parquet = root.join(format!("{stem}.parquet"));
        if parquet.is_file() {
            return Some(TableSource::Parquet(parquet));
        }
        let csv = root.join(format!("{stem}.csv"));
        csv.is_file().then_some(TableSource::Csv(csv))
    }

    pub fn path(&self) -> &Path {
        match self {
            TableSource::Csv(path) | TableSource::Parquet(path) => path,
        }
    }
}

/// Read a table from `source` and coerce it to the table's declared schema.
pub fn read_table(table: Table, source: &TableSource) -> Result<RecordBatch> {
    let raw = match source {
        TableSource::Csv(path) => read_csv(path)?,
        TableSource::Parquet(path) => read_parquet(path)?,
    };
    debug!(
        table = table.name(),
        path = %source.path().display(),
        rows = raw.num_rows(),
        "read table"
    );
    coerce(table, &raw)
}

/// Read a header-first, comma-delimited file with every column as text.
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    let mut file = File::open(path)?;
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(&mut file, Some(1))?;
    file.rewind()?;

    let text_fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(text_fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(BATCH_SIZE)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(BATCH_SIZE).build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Cast declared columns to their declared types, add missing declared
/// columns as nulls and keep any extra columns as text. Declared columns come
/// first, in declaration order.
pub fn coerce(table: Table, raw: &RecordBatch) -> Result<RecordBatch> {
    let rows = raw.num_rows();
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for (name, ty) in table.columns() {
        let data_type = ty.data_type();
        let column = match raw.column_by_name(name) {
            Some(col) if col.data_type() == &data_type => col.clone(),
            Some(col) => cast(col, &data_type)?,
            None => {
                debug!(
                    table = table.name(),
                    column = *name,
                    "declared column missing, filling nulls"
                );
                new_null_array(&data_type, rows)
            }
        };
        fields.push(Field::new(*name, data_type, true));
        columns.push(column);
    }

    let raw_schema = raw.schema();
    for (field, col) in raw_schema.fields().iter().zip(raw.columns()) {
        if table.column_type(field.name()).is_some() {
            continue;
        }
        let column = if field.data_type() == &DataType::Utf8 {
            col.clone()
        } else {
            cast(col, &DataType::Utf8)?
        };
        fields.push(Field::new(field.name(), DataType::Utf8, true));
        columns.push(column);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(|e| {
        Error::DataUnavailable {
            table: table.name(),
            reason: e.to_string(),
        }
    })
}

/// An empty batch with the table's declared schema.
pub fn empty_table(table: Table) -> RecordBatch {
    RecordBatch::new_empty(table.schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Date32Array, Float64Array, Int64Array, StringArray};
    use std::io::Write;

    fn write_csv(dir: &Path, table: Table, body: &str) -> PathBuf {
        let path = dir.join(format!("{}.csv", table.file_stem()));
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_csv_coerces_declared_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            Table::RaceResults,
            "raceId,year,positionNumber,positionText,driverId,points,extra\n\
             1,2010,1,1,alonso,25,a\n\
             1,2010,,Ret,webber,,b\n\
             1,2010,3,3,massa,15.5,c\n",
        );
        let batch = read_table(Table::RaceResults, &TableSource::Csv(path)).unwrap();
        assert_eq!(batch.num_rows(), 3);

        let position = batch
            .column_by_name("positionNumber")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(position.value(0), 1);
        assert!(position.is_null(1));

        let points = batch
            .column_by_name("points")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(points.value(2), 15.5);

        // Missing declared column is present but null.
        let grid = batch.column_by_name("gridPositionNumber").unwrap();
        assert_eq!(grid.null_count(), 3);

        // Undeclared columns survive as text after the declared ones.
        let extra = batch
            .column_by_name("extra")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(extra.value(1), "b");
        assert_eq!(batch.schema().index_of("extra").unwrap(), Table::RaceResults.columns().len());
    }

    #[test]
    fn test_unparseable_numbers_become_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            Table::Drivers,
            "id,name,permanentNumber,dateOfBirth\n\
             hamilton,Lewis Hamilton,44,1985-01-07\n\
             farina,Nino Farina,N/A,not-a-date\n",
        );
        let batch = read_table(Table::Drivers, &TableSource::Csv(path)).unwrap();
        let number = batch.column_by_name("permanentNumber").unwrap();
        assert!(number.is_null(1));

        let born = batch
            .column_by_name("dateOfBirth")
            .unwrap()
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        assert_eq!(
            born.value_as_date(0),
            chrono::NaiveDate::from_ymd_opt(1985, 1, 7)
        );
        assert!(born.is_null(1));
    }

    #[test]
    fn test_locate_prefers_parquet() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(TableSource::locate(dir.path(), Table::Races), None);

        let csv = write_csv(dir.path(), Table::Races, "raceId,year\n1,1950\n");
        assert_eq!(
            TableSource::locate(dir.path(), Table::Races),
            Some(TableSource::Csv(csv))
        );

        let parquet = dir.path().join("f1db-races.parquet");
        File::create(&parquet).unwrap();
        assert_eq!(
            TableSource::locate(dir.path(), Table::Races),
            Some(TableSource::Parquet(parquet))
        );
    }

    #[test]
    fn test_read_parquet_round_trip() {
        use parquet::arrow::ArrowWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f1db-countries.parquet");
        let batch = RecordBatch::try_from_iter(vec![
            ("id", Arc::new(StringArray::from(vec!["italy"])) as ArrayRef),
            ("name", Arc::new(StringArray::from(vec!["Italy"])) as ArrayRef),
            ("alpha3Code", Arc::new(StringArray::from(vec!["ITA"])) as ArrayRef),
        ])
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let read = read_table(Table::Countries, &TableSource::Parquet(path)).unwrap();
        assert_eq!(read.num_rows(), 1);
        assert_eq!(read.schema(), Table::Countries.schema());
    }

    #[test]
    fn test_empty_table_has_declared_schema() {
        let batch = empty_table(Table::PitStops);
        assert_eq!(batch.num_rows(), 0);
        assert!(batch.column_by_name("stop").is_some());
    }
}
