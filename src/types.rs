//! Core data types for plot-sampler

use serde::{Deserialize, Serialize};

use crate::projection::Crs;

/// A geographic point as (longitude, latitude) in a named CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
    #[serde(skip)]
    pub crs: Crs,
}

impl GeoPoint {
    /// Creates a point in WGS84 (EPSG:4326)
    pub fn new(lon: f64, lat: f64) -> Self {
        Self::with_crs(lon, lat, Crs::WGS84)
    }

    /// Creates a point in the given CRS
    pub fn with_crs(lon: f64, lat: f64, crs: Crs) -> Self {
        Self { lon, lat, crs }
    }
}

/// A point in a planar CRS, in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub crs: Crs,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64, crs: Crs) -> Self {
        Self { x, y, crs }
    }

    /// Euclidean distance in meters to another point of the same CRS
    pub fn distance(&self, other: &ProjectedPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// One normalized input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRecord {
    #[serde(rename = "plot_ID")]
    pub plot_id: String,
    #[serde(rename = "LAT")]
    pub lat: f64,
    #[serde(rename = "LON")]
    pub lon: f64,
}

impl PlotRecord {
    pub fn new(plot_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            plot_id: plot_id.into(),
            lat,
            lon,
        }
    }

    /// The record location as a WGS84 point
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

/// One generated sample point tagged with its source plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    #[serde(rename = "plot_ID")]
    pub plot_id: String,
    pub lon: f64,
    pub lat: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_defaults_to_wgs84() {
        let point = GeoPoint::new(-84.0, 36.0);
        assert_eq!(point.crs, Crs::WGS84);
        assert_eq!(point.lon, -84.0);
        assert_eq!(point.lat, 36.0);
    }

    #[test]
    fn test_projected_distance() {
        let a = ProjectedPoint::new(0.0, 0.0, Crs::new(32617));
        let b = ProjectedPoint::new(3.0, 4.0, Crs::new(32617));
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_record_location() {
        let record = PlotRecord::new("A", 36.0, -84.0);
        let location = record.location();
        assert_eq!(location.lon, -84.0);
        assert_eq!(location.lat, 36.0);
    }
}
