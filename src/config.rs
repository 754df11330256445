//! YAML configuration for the binaries

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::cache::ExtractCache;
use crate::extract::{Catalog, Extractor};
use crate::sampler::{validate_radius, validate_sample_count, SpatialSampler, DEFAULT_CIRCLE_SEGMENTS, DEFAULT_MAX_SAMPLES};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sampler: SamplerConfig,
    pub cache: CacheConfig,
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Upload size limit in megabytes
    pub body_limit_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            body_limit_mb: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub circle_segments: usize,
    pub default_radius_ft: f64,
    pub default_sample_count: i64,
    /// Largest sample count a single request may ask for
    pub max_sample_count: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            circle_segments: DEFAULT_CIRCLE_SEGMENTS,
            default_radius_ft: 1000.0,
            default_sample_count: 5,
            max_sample_count: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl SamplerConfig {
    pub fn build_sampler(&self) -> Result<SpatialSampler> {
        SpatialSampler::new(self.circle_segments)?.with_max_samples(self.max_sample_count)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 256 }
    }
}

impl CacheConfig {
    pub fn build_cache(&self) -> ExtractCache {
        ExtractCache::new(self.max_entries)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// YAML dataset catalog; extraction is disabled without one
    pub catalog: Option<PathBuf>,
}

impl Config {
    /// Loads the configured catalog into an extractor backed by the configured cache
    pub fn build_extractor(&self) -> Result<Option<Extractor>> {
        let Some(path) = &self.extract.catalog else {
            return Ok(None);
        };

        let catalog = Catalog::from_file(path)?;
        log::info!("Loaded dataset catalog {} ({} datasets)", path.display(), catalog.len());
        Ok(Some(Extractor::new(catalog.into_loader_chain(), self.cache.build_cache())))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validate_radius(self.sampler.default_radius_ft)?;
        let sampler = self.sampler.build_sampler()?;
        sampler.check_sample_count(validate_sample_count(self.sampler.default_sample_count)?)?;
        if self.cache.max_entries == 0 {
            return Err(Error::Config("cache.max_entries must be positive".to_string()));
        }
        if self.server.body_limit_mb == 0 {
            return Err(Error::Config("server.body_limit_mb must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.sampler.circle_segments, 32);
        assert_eq!(config.sampler.default_radius_ft, 1000.0);
        assert_eq!(config.sampler.default_sample_count, 5);
        assert_eq!(config.cache.max_entries, 256);
        assert_eq!(config.sampler.max_sample_count, 10_000);
        assert!(config.extract.catalog.is_none());
        assert!(config.build_extractor().unwrap().is_none());
    }

    #[test]
    fn test_sample_count_limits() {
        let config = Config::from_yaml("sampler:\n  max_sample_count: 50\n").unwrap();
        assert_eq!(config.sampler.build_sampler().unwrap().max_samples(), 50);

        assert!(matches!(
            Config::from_yaml("sampler:\n  max_sample_count: 3\n  default_sample_count: 5\n"),
            Err(Error::InvalidSampleCount(5))
        ));
        assert!(matches!(
            Config::from_yaml("sampler:\n  max_sample_count: 0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(Config::from_yaml("cache:\n  max_entries: 0\n"), Err(Error::Config(_))));
    }

    #[test]
    fn test_extractor_from_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog.yaml");
        std::fs::write(
            &catalog,
            "images:\n  srtm:\n    width: 1\n    height: 1\n    geo_transform: [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0]\n    bands:\n      - name: elevation\n        values: [310.0]\n",
        )
        .unwrap();

        let yaml = format!("cache:\n  max_entries: 4\nextract:\n  catalog: {}\n", catalog.display());
        let config = Config::from_yaml(&yaml).unwrap();
        let extractor = config.build_extractor().unwrap().unwrap();
        assert_eq!(extractor.cache().stats().max_entries, 4);
    }

    #[test]
    fn test_partial_override() {
        let yaml = "server:\n  bind: 127.0.0.1:8080\nsampler:\n  circle_segments: 64\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.body_limit_mb, 100);
        assert_eq!(config.sampler.circle_segments, 64);
        assert_eq!(config.sampler.default_sample_count, 5);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_yaml("sampler:\n  circle_segments: 2\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_yaml("sampler:\n  default_radius_ft: -5\n"),
            Err(Error::InvalidRadius(_))
        ));
        assert!(matches!(Config::from_yaml("server: [1, 2]"), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "cache:\n  max_entries: 16\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.cache.max_entries, 16);

        assert!(matches!(Config::from_file(dir.path().join("missing.yaml")), Err(Error::Io(_))));
    }
}
