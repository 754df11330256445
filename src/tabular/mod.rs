//! CSV input and output
//!
//! Input must already use the normalized column names `plot_ID`, `LAT` and
//! `LON`; output rows are written as `plot_ID,lon,lat` and can be read back
//! for extraction.

pub mod reader;
pub mod writer;

pub use reader::{
    read_records, read_records_from_path, read_sample_rows, read_sample_rows_from_path, REQUIRED_COLUMNS,
    SAMPLE_COLUMNS,
};
pub use writer::{output_file_name, rows_to_csv_string, write_rows, write_rows_to_path};
