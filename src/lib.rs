//! plot-sampler - Privacy-preserving sampling around forest plot coordinates
//!
//! plot-sampler replaces each exact plot location with points drawn from a
//! randomly offset disk in the local UTM zone, so downstream pixel extraction
//! never sees the true coordinates.
//!
//! # Examples
//!
//! ## Single point
//!
//! ```no_run
//! use plot_sampler::{GeoPoint, SampleRequest, SpatialSampler};
//!
//! let sampler = SpatialSampler::default();
//! let request = SampleRequest::new(GeoPoint::new(-84.0, 36.0), 1000.0, 5, "plot-1")?;
//! let result = sampler.sample(&request, &mut rand::rng())?;
//!
//! for p in result.points() {
//!     println!("{}, {}", p.lon, p.lat);
//! }
//! # Ok::<(), plot_sampler::Error>(())
//! ```
//!
//! ## CSV batch
//!
//! ```no_run
//! use plot_sampler::{BatchDriver, BatchParams, FailurePolicy, SpatialSampler};
//! use plot_sampler::tabular::{read_records_from_path, write_rows_to_path, output_file_name};
//!
//! let records = read_records_from_path("plots.csv")?;
//! let params = BatchParams::new(1000.0, 5)?;
//! let driver = BatchDriver::new(SpatialSampler::default(), FailurePolicy::SkipAndReport);
//!
//! let output = driver.run_parallel(&records, &params, 42)?;
//! write_rows_to_path(output_file_name(1000.0), &output.rows)?;
//! # Ok::<(), plot_sampler::Error>(())
//! ```

pub mod error;
pub mod types;
pub mod projection;
pub mod sampler;
pub mod batch;
pub mod tabular;
pub mod extract;
pub mod cache;
pub mod config;
pub mod api;

pub use error::{Error, Result};
pub use types::{GeoPoint, ProjectedPoint, PlotRecord, SampleRow};
pub use projection::{Crs, Transformer, UtmZone, LocalProjection};
pub use sampler::{SampleRequest, SampleResult, SpatialSampler};
pub use batch::{BatchDriver, BatchOutput, BatchParams, FailurePolicy};
pub use config::Config;
