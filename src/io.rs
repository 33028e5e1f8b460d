use crate::errors::{BenchError, BenchResult};
use polars::prelude::*;
use std::path::Path;

/// Read up to `n_rows` rows of a CSV file into a materialized DataFrame.
/// `None` reads the whole file.
pub fn read_csv<P: AsRef<Path>>(path: P, n_rows: Option<usize>) -> BenchResult<DataFrame> {
    LazyCsvReader::new(path)
        .with_n_rows(n_rows)
        .with_try_parse_dates(true)
        .finish()
        .map_err(BenchError::PolarsError)?
        .collect()
        .map_err(BenchError::PolarsError)
}

pub fn read_parquet<P: AsRef<Path>>(path: P) -> BenchResult<DataFrame> {
    LazyFrame::scan_parquet(path, Default::default())
        .map_err(BenchError::PolarsError)?
        .collect()
        .map_err(BenchError::PolarsError)
}

pub fn write_parquet<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> BenchResult<()> {
    let file = std::fs::File::create(path).map_err(BenchError::IoError)?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(BenchError::PolarsError)?;
    Ok(())
}
