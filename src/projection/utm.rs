use crate::error::{Error, Result};
use crate::projection::crs::Crs;
use crate::projection::epsg;
use crate::projection::transformer::Transformer;
use crate::types::{GeoPoint, ProjectedPoint};

/// Hemisphere of a UTM zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
}

/// A WGS84 / UTM zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

impl UtmZone {
    /// Selects the zone covering a WGS84 longitude/latitude
    ///
    /// Zone number is `floor((lon + 180) / 6) + 1`, with longitude 180 folded
    /// into zone 60. Latitude 0 counts as north.
    pub fn for_lonlat(lon: f64, lat: f64) -> Result<Self> {
        if !lon.is_finite() || !lat.is_finite() || !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::InvalidCoordinate { lon, lat });
        }

        let number = (((lon + 180.0) / 6.0).floor() as u8 + 1).min(60);
        let hemisphere = if lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        };

        Ok(Self { number, hemisphere })
    }

    /// Returns the zone number (1..=60)
    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// EPSG code of the zone: 326xx north, 327xx south
    pub fn epsg(&self) -> u16 {
        let base = match self.hemisphere {
            Hemisphere::North => epsg::UTM_NORTH_BASE,
            Hemisphere::South => epsg::UTM_SOUTH_BASE,
        };
        base + u16::from(self.number)
    }

    pub fn crs(&self) -> Crs {
        Crs::new(self.epsg())
    }
}

/// Round trip between a point's own CRS and the UTM zone that covers it
pub struct LocalProjection {
    zone: UtmZone,
    transformer: Transformer,
}

impl LocalProjection {
    /// Builds the local projection for a point in any recognized CRS
    pub fn for_point(point: &GeoPoint) -> Result<Self> {
        let (lon, lat) = if point.crs == Crs::WGS84 {
            (point.lon, point.lat)
        } else {
            if !point.lon.is_finite() || !point.lat.is_finite() {
                return Err(Error::InvalidCoordinate { lon: point.lon, lat: point.lat });
            }
            Transformer::new(point.crs, Crs::WGS84)?.transform((point.lon, point.lat))?
        };

        let zone = UtmZone::for_lonlat(lon, lat)?;
        let transformer = Transformer::new(point.crs, zone.crs())?;

        Ok(Self { zone, transformer })
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    /// The CRS points come back in
    pub fn source_crs(&self) -> Crs {
        self.transformer.from_crs()
    }

    /// Projects a point of the source CRS into the zone
    pub fn project(&self, point: &GeoPoint) -> Result<ProjectedPoint> {
        if point.crs != self.source_crs() {
            return Err(Error::Projection(format!(
                "Expected a point in {}, got {}",
                self.source_crs(),
                point.crs
            )));
        }

        let (x, y) = self.transformer.transform((point.lon, point.lat))?;
        Ok(ProjectedPoint::new(x, y, self.zone.crs()))
    }

    /// Projects a zone point back into the source CRS
    pub fn unproject(&self, point: &ProjectedPoint) -> Result<GeoPoint> {
        let (lon, lat) = self.transformer.transform_inverse((point.x, point.y))?;
        Ok(GeoPoint::with_crs(lon, lat, self.source_crs()))
    }
}
