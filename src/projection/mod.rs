//! Coordinate reference systems and transforms
//!
//! Sampling happens in meters, so every geographic point is moved into the
//! UTM zone covering it before any geometry is built.

pub mod crs;
pub mod transformer;
pub mod utm;

pub use crs::Crs;
pub use transformer::Transformer;
pub use utm::{Hemisphere, LocalProjection, UtmZone};

/// Well-known EPSG codes
pub mod epsg {
    /// WGS84 geographic coordinates
    pub const WGS84: u16 = 4326;
    /// Web Mercator
    pub const WEB_MERCATOR: u16 = 3857;
    /// WGS84 / UTM north zones are 32601..=32660
    pub const UTM_NORTH_BASE: u16 = 32600;
    /// WGS84 / UTM south zones are 32701..=32760
    pub const UTM_SOUTH_BASE: u16 = 32700;
}
