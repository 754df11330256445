//! Error types for plot-sampler

use std::fmt;
use std::io;

use crate::extract::LoadError;

/// Result type for plot-sampler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in plot-sampler operations
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(io::Error),

    /// CSV read or write error
    Csv(csv::Error),

    /// Buffer radius is negative or not a finite number
    InvalidRadius(f64),

    /// Requested sample count is negative
    InvalidSampleCount(i64),

    /// CRS identifier is not a recognized projection
    UnknownCrs(String),

    /// Coordinate is not finite or outside the valid range of its CRS
    InvalidCoordinate { lon: f64, lat: f64 },

    /// Required input column is missing
    ColumnNotFound(String),

    /// Every dataset loader failed for a dataset identifier
    RemoteLookupFailed {
        dataset: String,
        attempts: Vec<LoadError>,
    },

    /// Malformed data handed to a loader or image
    InvalidFormat(String),

    /// Projection error
    Projection(String),

    /// Configuration error
    Config(String),
}

impl Error {
    /// Returns true for errors caused by caller input rather than the environment
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidRadius(_)
                | Error::InvalidSampleCount(_)
                | Error::UnknownCrs(_)
                | Error::InvalidCoordinate { .. }
                | Error::ColumnNotFound(_)
                | Error::Csv(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Csv(e) => write!(f, "CSV error: {}", e),
            Error::InvalidRadius(radius) => write!(f, "Invalid radius: {} ft", radius),
            Error::InvalidSampleCount(count) => write!(f, "Invalid sample count: {}", count),
            Error::UnknownCrs(crs) => write!(f, "Unknown CRS: {}", crs),
            Error::InvalidCoordinate { lon, lat } => {
                write!(f, "Invalid coordinate: lon={}, lat={}", lon, lat)
            }
            Error::ColumnNotFound(column) => write!(f, "Column not found: {}", column),
            Error::RemoteLookupFailed { dataset, attempts } => {
                write!(f, "Lookup failed for dataset {}", dataset)?;
                for attempt in attempts {
                    write!(f, "; {}", attempt)?;
                }
                Ok(())
            }
            Error::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Error::Projection(msg) => write!(f, "Projection error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Error::Csv(error)
    }
}
