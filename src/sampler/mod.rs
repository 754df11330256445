//! Coordinate obfuscation by sampling a randomized disk
//!
//! A plot location is replaced by points drawn uniformly from a disk that
//! contains the location at a random off-center position:
//!
//! 1. project the origin into its UTM zone,
//! 2. move the disk center up to one radius away in a random direction,
//! 3. approximate the disk with a regular polygon,
//! 4. rejection-sample the polygon and project the accepted points back.
//!
//! ```no_run
//! use plot_sampler::{GeoPoint, SampleRequest, SpatialSampler};
//!
//! let sampler = SpatialSampler::default();
//! let request = SampleRequest::new(GeoPoint::new(-84.0, 36.0), 1000.0, 5, "plot-1")?;
//! let result = sampler.sample(&request, &mut rand::rng())?;
//! assert_eq!(result.len(), 5);
//! # Ok::<(), plot_sampler::Error>(())
//! ```

pub mod disk;
pub mod rejection;

use rand::Rng;

use crate::error::{Error, Result};
use crate::projection::LocalProjection;
use crate::types::{GeoPoint, SampleRow};

pub use disk::ObfuscationDisk;

/// International foot in meters
pub const FEET_TO_METERS: f64 = 0.3048;

/// Number of polygon segments used to approximate the disk
pub const DEFAULT_CIRCLE_SEGMENTS: usize = 32;

/// Radii below this many meters are treated as a single point
///
/// UTM coordinates reach 1e7 m, where a smaller disk spans too few
/// representable values for rejection sampling to terminate.
pub const MIN_RADIUS_M: f64 = 1e-6;

/// Hard ceiling on points per request, whatever the configuration says
pub const MAX_SAMPLE_COUNT: usize = 1_000_000;

/// Default per-request point limit of a [`SpatialSampler`]
pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

/// A validated request to obfuscate one point
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    origin: GeoPoint,
    radius_feet: f64,
    sample_count: usize,
    plot_id: String,
}

impl SampleRequest {
    /// Creates a request, rejecting negative radius or sample count
    pub fn new(origin: GeoPoint, radius_feet: f64, sample_count: i64, plot_id: impl Into<String>) -> Result<Self> {
        let radius_feet = validate_radius(radius_feet)?;
        let sample_count = validate_sample_count(sample_count)?;

        Ok(Self {
            origin,
            radius_feet,
            sample_count,
            plot_id: plot_id.into(),
        })
    }

    pub fn origin(&self) -> &GeoPoint {
        &self.origin
    }

    pub fn radius_feet(&self) -> f64 {
        self.radius_feet
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_feet * FEET_TO_METERS
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn plot_id(&self) -> &str {
        &self.plot_id
    }
}

/// Checks a buffer radius in feet
pub fn validate_radius(radius_feet: f64) -> Result<f64> {
    if !radius_feet.is_finite() || radius_feet < 0.0 {
        return Err(Error::InvalidRadius(radius_feet));
    }
    Ok(radius_feet)
}

/// Checks a requested sample count against zero and [`MAX_SAMPLE_COUNT`]
pub fn validate_sample_count(sample_count: i64) -> Result<usize> {
    usize::try_from(sample_count)
        .ok()
        .filter(|&count| count <= MAX_SAMPLE_COUNT)
        .ok_or(Error::InvalidSampleCount(sample_count))
}

/// Sample points generated for one request, in the origin's CRS
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    plot_id: String,
    points: Vec<GeoPoint>,
}

impl SampleResult {
    pub fn plot_id(&self) -> &str {
        &self.plot_id
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Flattens into output rows tagged with the plot ID
    pub fn into_rows(self) -> Vec<SampleRow> {
        let plot_id = self.plot_id;
        self.points
            .into_iter()
            .map(|p| SampleRow {
                plot_id: plot_id.clone(),
                lon: p.lon,
                lat: p.lat,
            })
            .collect()
    }
}

/// Turns sample requests into obfuscated sample points
#[derive(Debug, Clone, Copy)]
pub struct SpatialSampler {
    segments: usize,
    max_samples: usize,
}

impl SpatialSampler {
    /// Creates a sampler approximating the disk with `segments` polygon sides
    pub fn new(segments: usize) -> Result<Self> {
        if segments < 3 {
            return Err(Error::Config(format!(
                "circle_segments must be at least 3, got {}",
                segments
            )));
        }
        Ok(Self {
            segments,
            max_samples: DEFAULT_MAX_SAMPLES,
        })
    }

    /// Caps the number of points a single request may ask for
    pub fn with_max_samples(mut self, max_samples: usize) -> Result<Self> {
        if max_samples == 0 || max_samples > MAX_SAMPLE_COUNT {
            return Err(Error::Config(format!(
                "max_sample_count must be between 1 and {}, got {}",
                MAX_SAMPLE_COUNT, max_samples
            )));
        }
        self.max_samples = max_samples;
        Ok(self)
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Rejects counts above this sampler's limit
    pub fn check_sample_count(&self, sample_count: usize) -> Result<()> {
        if sample_count > self.max_samples {
            return Err(Error::InvalidSampleCount(i64::try_from(sample_count).unwrap_or(i64::MAX)));
        }
        Ok(())
    }

    /// Generates `sample_count` points inside a randomized disk around the origin
    pub fn sample<R: Rng>(&self, request: &SampleRequest, rng: &mut R) -> Result<SampleResult> {
        self.check_sample_count(request.sample_count())?;

        let origin = request.origin();
        let local = LocalProjection::for_point(origin)?;
        let projected = local.project(origin)?;

        let count = request.sample_count();
        let radius_m = request.radius_meters();

        let points = if count == 0 {
            Vec::new()
        } else if radius_m < MIN_RADIUS_M {
            vec![*origin; count]
        } else {
            let disk = ObfuscationDisk::around(rng, &projected, radius_m, self.segments);
            match disk.sample(rng, count) {
                Some(planar) => planar
                    .iter()
                    .map(|p| local.unproject(p))
                    .collect::<Result<Vec<_>>>()?,
                None => {
                    log::debug!(
                        "Disk for plot {} collapsed at radius {} m, returning origin copies",
                        request.plot_id(),
                        radius_m
                    );
                    vec![*origin; count]
                }
            }
        };

        log::debug!(
            "Sampled {} points for plot {} in zone {}",
            points.len(),
            request.plot_id(),
            local.zone().epsg()
        );

        Ok(SampleResult {
            plot_id: request.plot_id().to_string(),
            points,
        })
    }
}

impl Default for SpatialSampler {
    fn default() -> Self {
        Self {
            segments: DEFAULT_CIRCLE_SEGMENTS,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}
