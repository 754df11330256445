use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::SampleRow;

/// Writes sample rows as `plot_ID,lon,lat` CSV
pub fn write_rows<W: Write>(output: W, rows: &[SampleRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer.write_record(["plot_ID", "lon", "lat"])?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes sample rows to a CSV file
pub fn write_rows_to_path<P: AsRef<Path>>(path: P, rows: &[SampleRow]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_rows(file, rows)
}

/// Renders sample rows as a CSV string
pub fn rows_to_csv_string(rows: &[SampleRow]) -> Result<String> {
    let mut buffer = Vec::with_capacity(rows.len() * 40 + 16);
    write_rows(&mut buffer, rows)?;
    String::from_utf8(buffer).map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Download name for a batch buffered at `radius_feet`
pub fn output_file_name(radius_feet: f64) -> String {
    format!("buffered_coordinates_{}ft.csv", radius_feet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::reader::read_records;

    fn rows() -> Vec<SampleRow> {
        vec![
            SampleRow { plot_id: "A".to_string(), lon: -84.001, lat: 36.002 },
            SampleRow { plot_id: "A".to_string(), lon: -83.999, lat: 35.998 },
        ]
    }

    #[test]
    fn test_csv_layout() {
        let csv = rows_to_csv_string(&rows()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "plot_ID,lon,lat");
        assert_eq!(lines[1], "A,-84.001,36.002");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_rows_still_have_header() {
        let csv = rows_to_csv_string(&[]).unwrap();
        assert_eq!(csv, "plot_ID,lon,lat\n");
    }

    #[test]
    fn test_output_can_be_read_back_as_input() {
        // sampled points can feed a later extraction run
        let csv = rows_to_csv_string(&rows()).unwrap();
        let renamed = csv.replacen("plot_ID,lon,lat", "plot_ID,LON,LAT", 1);
        let records = read_records(renamed.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].lon, -83.999);
    }

    #[test]
    fn test_write_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(output_file_name(1000.0));
        write_rows_to_path(&path, &rows()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("plot_ID,lon,lat\n"));
        assert!(path.ends_with("buffered_coordinates_1000ft.csv"));
    }
}
