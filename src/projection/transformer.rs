use crate::error::Result;
use crate::projection::crs::Crs;

/// Transforms coordinates between two coordinate reference systems
///
/// Geographic coordinates go in and come out as (longitude, latitude) degrees.
pub struct Transformer {
    forward: backend::Pipeline,
    inverse: backend::Pipeline,
    from: Crs,
    to: Crs,
}

impl Transformer {
    /// Creates a new transformer from source to target CRS
    pub fn new(from: Crs, to: Crs) -> Result<Self> {
        Ok(Self {
            forward: backend::Pipeline::new(from, to)?,
            inverse: backend::Pipeline::new(to, from)?,
            from,
            to,
        })
    }

    /// Transforms a coordinate from source to target CRS
    pub fn transform(&self, coord: (f64, f64)) -> Result<(f64, f64)> {
        self.forward.convert(coord)
    }

    /// Transforms multiple coordinates in bulk
    pub fn transform_many(&self, coords: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
        coords.iter().map(|&coord| self.transform(coord)).collect()
    }

    /// Transforms a coordinate from target back to source CRS
    pub fn transform_inverse(&self, coord: (f64, f64)) -> Result<(f64, f64)> {
        self.inverse.convert(coord)
    }

    /// Returns the source CRS
    pub fn from_crs(&self) -> Crs {
        self.from
    }

    /// Returns the target CRS
    pub fn to_crs(&self) -> Crs {
        self.to
    }
}

#[cfg(not(feature = "proj"))]
mod backend {
    use proj4rs::proj::Proj;
    use proj4rs::transform::transform;

    use crate::error::{Error, Result};
    use crate::projection::crs::Crs;

    pub struct Pipeline {
        source: Proj,
        target: Proj,
        source_geographic: bool,
        target_geographic: bool,
        identity: bool,
    }

    impl Pipeline {
        pub fn new(from: Crs, to: Crs) -> Result<Self> {
            let source = Proj::from_proj_string(from.definition()?)
                .map_err(|e| Error::Projection(format!("Invalid source projection {}: {:?}", from, e)))?;
            let target = Proj::from_proj_string(to.definition()?)
                .map_err(|e| Error::Projection(format!("Invalid target projection {}: {:?}", to, e)))?;

            Ok(Self {
                source,
                target,
                source_geographic: from.is_geographic(),
                target_geographic: to.is_geographic(),
                identity: from == to,
            })
        }

        pub fn convert(&self, (x, y): (f64, f64)) -> Result<(f64, f64)> {
            if self.identity {
                return Ok((x, y));
            }

            // proj4rs works in radians for geographic systems
            let mut point = if self.source_geographic {
                (x.to_radians(), y.to_radians(), 0.0)
            } else {
                (x, y, 0.0)
            };

            transform(&self.source, &self.target, &mut point)
                .map_err(|e| Error::Projection(format!("Transformation failed: {:?}", e)))?;

            let out = if self.target_geographic {
                (point.0.to_degrees(), point.1.to_degrees())
            } else {
                (point.0, point.1)
            };

            if !out.0.is_finite() || !out.1.is_finite() {
                return Err(Error::Projection(format!(
                    "Transformation of ({}, {}) produced a non-finite result",
                    x, y
                )));
            }

            Ok(out)
        }
    }
}

#[cfg(feature = "proj")]
mod backend {
    use proj::Proj;

    use crate::error::{Error, Result};
    use crate::projection::crs::Crs;

    pub struct Pipeline {
        proj: Proj,
    }

    impl Pipeline {
        pub fn new(from: Crs, to: Crs) -> Result<Self> {
            // Reject codes the definitions database does not know, same as the default backend
            from.definition()?;
            to.definition()?;

            let proj = Proj::new_known_crs(&from.to_string(), &to.to_string(), None)
                .map_err(|e| Error::Projection(format!("Failed to create projection: {}", e)))?;

            Ok(Self { proj })
        }

        pub fn convert(&self, coord: (f64, f64)) -> Result<(f64, f64)> {
            self.proj
                .convert(coord)
                .map_err(|e| Error::Projection(format!("Transformation failed: {}", e)))
        }
    }
}
