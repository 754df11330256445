//! YAML dataset catalog
//!
//! ```yaml
//! images:
//!   srtm:
//!     width: 2
//!     height: 1
//!     geo_transform: [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0]
//!     crs: EPSG:4326          # optional, WGS84 by default
//!     bands:
//!       - name: elevation
//!         values: [310.0, ~]  # `~` marks no data
//! collections:
//!   modis:
//!     - date: 2020-06-01
//!       image: { width: ..., height: ..., geo_transform: ..., bands: ... }
//! features:
//!   ecoregions:
//!     grid: { width: 2, height: 2, geo_transform: [...] }
//!     features:
//!       - polygon: [[-85.0, 37.0], [-84.0, 37.0], [-84.0, 36.0]]
//!         properties: { code: 8 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use geo::{LineString, Polygon};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::extract::catalog::{Catalog, DatedImage, Feature, FeatureLayer};
use crate::extract::image::GridImage;
use crate::projection::Crs;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogManifest {
    images: BTreeMap<String, ImageSpec>,
    collections: BTreeMap<String, Vec<DatedImageSpec>>,
    features: BTreeMap<String, FeatureLayerSpec>,
}

#[derive(Debug, Deserialize)]
struct ImageSpec {
    width: usize,
    height: usize,
    geo_transform: [f64; 6],
    #[serde(default)]
    crs: Option<String>,
    #[serde(default)]
    bands: Vec<BandSpec>,
}

#[derive(Debug, Deserialize)]
struct BandSpec {
    name: String,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct DatedImageSpec {
    date: String,
    image: ImageSpec,
}

#[derive(Debug, Deserialize)]
struct FeatureLayerSpec {
    grid: ImageSpec,
    #[serde(default)]
    features: Vec<FeatureSpec>,
}

#[derive(Debug, Deserialize)]
struct FeatureSpec {
    polygon: Vec<[f64; 2]>,
    #[serde(default)]
    properties: BTreeMap<String, f64>,
}

impl ImageSpec {
    fn into_image(self, dataset_id: &str) -> Result<GridImage> {
        let crs = match &self.crs {
            Some(crs) => crs.parse()?,
            None => Crs::WGS84,
        };

        let mut image = GridImage::new(self.width, self.height, self.geo_transform, crs);
        for band in self.bands {
            let values = band.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            image = image
                .with_band(band.name, values)
                .map_err(|e| Error::InvalidFormat(format!("Dataset {}: {}", dataset_id, e)))?;
        }
        Ok(image)
    }
}

impl FeatureSpec {
    fn into_feature(self, dataset_id: &str) -> Result<Feature> {
        if self.polygon.len() < 3 {
            return Err(Error::InvalidFormat(format!(
                "Dataset {}: polygon needs at least 3 vertices, got {}",
                dataset_id,
                self.polygon.len()
            )));
        }

        let ring: Vec<(f64, f64)> = self.polygon.into_iter().map(|[x, y]| (x, y)).collect();
        Ok(Feature {
            polygon: Polygon::new(LineString::from(ring), vec![]),
            properties: self.properties,
        })
    }
}

impl Catalog {
    /// Parses a YAML catalog
    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: CatalogManifest = serde_yaml::from_str(content)
            .map_err(|e| Error::InvalidFormat(format!("Catalog: {}", e)))?;

        let mut catalog = Catalog::new();

        for (id, spec) in manifest.images {
            let image = spec.into_image(&id)?;
            catalog.insert_image(id, image);
        }

        for (id, specs) in manifest.collections {
            let images = specs
                .into_iter()
                .map(|spec| {
                    let date = NaiveDate::parse_from_str(spec.date.trim(), "%Y-%m-%d").map_err(|e| {
                        Error::InvalidFormat(format!("Dataset {}: invalid date {:?}: {}", id, spec.date, e))
                    })?;
                    Ok(DatedImage { date, image: spec.image.into_image(&id)? })
                })
                .collect::<Result<Vec<_>>>()?;
            catalog.insert_collection(id, images);
        }

        for (id, spec) in manifest.features {
            let grid = spec.grid.into_image(&id)?;
            let features = spec
                .features
                .into_iter()
                .map(|f| f.into_feature(&id))
                .collect::<Result<Vec<_>>>()?;
            catalog.insert_features(id, FeatureLayer { grid, features });
        }

        Ok(catalog)
    }

    /// Reads a YAML catalog file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DatasetKind;

    const CATALOG: &str = r#"
images:
  srtm:
    width: 2
    height: 1
    geo_transform: [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0]
    bands:
      - name: elevation
        values: [310.0, ~]
collections:
  modis:
    - date: 2020-06-01
      image:
        width: 1
        height: 1
        geo_transform: [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0]
        bands:
          - name: ndvi
            values: [0.6]
    - date: 2021-06-01
      image:
        width: 1
        height: 1
        geo_transform: [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0]
        bands:
          - name: ndvi
            values: [0.8]
features:
  ecoregions:
    grid:
      width: 1
      height: 1
      geo_transform: [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0]
    features:
      - polygon: [[-85.0, 37.0], [-84.0, 37.0], [-84.0, 36.0], [-85.0, 36.0]]
        properties: { code: 8 }
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);

        let chain = catalog.into_loader_chain();

        let (kind, image) = chain.load("srtm", None).unwrap();
        assert_eq!(kind, DatasetKind::Image);
        assert_eq!(image.values_at(-84.5, 36.5), vec![Some(310.0)]);
        assert_eq!(image.values_at(-83.5, 36.5), vec![None]);

        let (kind, image) = chain.load("modis", None).unwrap();
        assert_eq!(kind, DatasetKind::ImageCollection);
        let ndvi = image.values_at(-84.5, 36.5)[0].unwrap();
        assert!((ndvi - 0.7).abs() < 1e-12);

        let (kind, image) = chain.load("ecoregions", None).unwrap();
        assert_eq!(kind, DatasetKind::FeatureCollection);
        assert_eq!(image.values_at(-84.5, 36.5), vec![Some(8.0)]);
    }

    #[test]
    fn test_projected_image_crs() {
        let yaml = "images:\n  canopy:\n    width: 1\n    height: 1\n    geo_transform: [0.0, 30.0, 0.0, 0.0, 0.0, -30.0]\n    crs: EPSG:32617\n";
        let catalog = Catalog::from_yaml(yaml).unwrap();
        let (_, image) = catalog.into_loader_chain().load("canopy", None).unwrap();
        assert_eq!(image.crs().epsg(), 32617);
    }

    #[test]
    fn test_invalid_catalogs() {
        let wrong_band = "images:\n  a:\n    width: 2\n    height: 2\n    geo_transform: [0, 1, 0, 0, 0, -1]\n    bands:\n      - name: b\n        values: [1.0]\n";
        assert!(matches!(Catalog::from_yaml(wrong_band), Err(Error::InvalidFormat(_))));

        let bad_crs = "images:\n  a:\n    width: 1\n    height: 1\n    geo_transform: [0, 1, 0, 0, 0, -1]\n    crs: EPSG:1\n";
        assert!(matches!(Catalog::from_yaml(bad_crs), Err(Error::UnknownCrs(_))));

        let bad_date = "collections:\n  c:\n    - date: june\n      image:\n        width: 1\n        height: 1\n        geo_transform: [0, 1, 0, 0, 0, -1]\n";
        assert!(matches!(Catalog::from_yaml(bad_date), Err(Error::InvalidFormat(_))));

        assert!(matches!(Catalog::from_yaml("images: 3"), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(Catalog::from_file("/nonexistent/catalog.yaml"), Err(Error::Io(_))));
    }
}
