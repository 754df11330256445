//! HTTP surface for sampling and pixel-value extraction

pub mod handlers;
pub mod models;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::extract::Extractor;
use crate::sampler::SpatialSampler;

pub use routes::create_router;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sampler: SpatialSampler,
    /// Present when a dataset catalog is configured
    pub extractor: Option<Arc<Extractor>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let sampler = config.sampler.build_sampler()?;
        let extractor = config.build_extractor()?.map(Arc::new);
        Ok(Self {
            config: Arc::new(config),
            sampler,
            extractor,
        })
    }
}
