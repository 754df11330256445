use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::projection::epsg;

/// A coordinate reference system identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs(u16);

impl Crs {
    pub const WGS84: Crs = Crs(epsg::WGS84);

    /// Wraps an EPSG code without checking it against the definitions database
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the EPSG code
    pub fn epsg(&self) -> u16 {
        self.0
    }

    /// Returns the PROJ4 definition for this CRS
    pub fn definition(&self) -> Result<&'static str> {
        crs_definitions::from_code(self.0)
            .map(|def| def.proj4)
            .ok_or_else(|| Error::UnknownCrs(self.to_string()))
    }

    /// Whether coordinates in this CRS are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self.definition() {
            Ok(def) => def.contains("+proj=longlat"),
            Err(_) => self.0 == epsg::WGS84,
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = Error;

    /// Accepts `EPSG:<code>` (any case) or a bare code
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            Some(_) => return Err(Error::UnknownCrs(trimmed.to_string())),
            None => trimmed,
        };

        let code: u16 = code
            .trim()
            .parse()
            .map_err(|_| Error::UnknownCrs(trimmed.to_string()))?;

        let crs = Crs(code);
        crs.definition()?;
        Ok(crs)
    }
}
