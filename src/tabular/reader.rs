use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{PlotRecord, SampleRow};

/// Columns every input file must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["plot_ID", "LAT", "LON"];

/// Columns of a sampled point file, as written by the CSV writer
pub const SAMPLE_COLUMNS: [&str; 3] = ["plot_ID", "lon", "lat"];

fn check_headers<R: Read>(reader: &mut csv::Reader<R>, required: &[&str]) -> Result<()> {
    let headers = reader.headers()?;
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(Error::ColumnNotFound(column.to_string()));
        }
    }
    Ok(())
}

/// Reads normalized plot records from CSV
///
/// Extra columns are ignored. A malformed row fails the whole read rather
/// than being dropped.
pub fn read_records<R: Read>(input: R) -> Result<Vec<PlotRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    check_headers(&mut reader, &REQUIRED_COLUMNS)?;

    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<PlotRecord>, csv::Error>>()?;

    log::debug!("Read {} plot records", records.len());
    Ok(records)
}

/// Reads normalized plot records from a CSV file
pub fn read_records_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<PlotRecord>> {
    let file = File::open(path.as_ref())?;
    read_records(file)
}

/// Reads sampled points back from `plot_ID,lon,lat` CSV
pub fn read_sample_rows<R: Read>(input: R) -> Result<Vec<SampleRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(input);

    check_headers(&mut reader, &SAMPLE_COLUMNS)?;

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<SampleRow>, csv::Error>>()?;

    log::debug!("Read {} sample rows", rows.len());
    Ok(rows)
}

/// Reads sampled points from a CSV file
pub fn read_sample_rows_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<SampleRow>> {
    let file = File::open(path.as_ref())?;
    read_sample_rows(file)
}
