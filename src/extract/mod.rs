//! Pixel-value extraction at sample points
//!
//! A dataset identifier is resolved by a [`LoaderChain`] (Image, then
//! ImageCollection, then FeatureCollection), each point is looked up in the
//! resulting [`GridImage`], and the table is memoized in an [`ExtractCache`]
//! keyed by dataset, point geometry digest and date range.

pub mod catalog;
pub mod image;
pub mod loader;
mod manifest;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{ExtractCache, ExtractKey};
use crate::error::Result;
use crate::projection::{Crs, Transformer};
use crate::types::SampleRow;

pub use catalog::{Catalog, DatedImage, Feature, FeatureLayer};
pub use image::{Band, GridImage};
pub use loader::{DatasetKind, DatasetLoader, DateRange, LoadError, LoaderChain};

/// Values extracted for one point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractRow {
    pub plot_id: String,
    pub lon: f64,
    pub lat: f64,
    /// One entry per band; `None` outside the image or for no data
    pub values: Vec<Option<f64>>,
}

/// Extraction result keyed by point and plot identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractTable {
    pub bands: Vec<String>,
    pub rows: Vec<ExtractRow>,
}

impl ExtractTable {
    /// Renders as `plot_ID,lon,lat,<band>...` CSV with empty cells for missing values
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["plot_ID".to_string(), "lon".to_string(), "lat".to_string()];
        header.extend(self.bands.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.plot_id.clone(), row.lon.to_string(), row.lat.to_string()];
            record.extend(row.values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| crate::Error::Io(e.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|e| crate::Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Collapses the samples of each plot into one row, in first-seen plot order
    ///
    /// Coordinates become the mean sample location. Each band is the mean of
    /// the values present; a band with no value for any sample stays `None`.
    pub fn aggregate_by_plot(&self) -> ExtractTable {
        struct Accumulator {
            plot_id: String,
            lon: f64,
            lat: f64,
            samples: usize,
            sums: Vec<f64>,
            counts: Vec<usize>,
        }

        let band_count = self.bands.len();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Accumulator> = Vec::new();

        for row in &self.rows {
            let slot = *index.entry(row.plot_id.as_str()).or_insert_with(|| {
                groups.push(Accumulator {
                    plot_id: row.plot_id.clone(),
                    lon: 0.0,
                    lat: 0.0,
                    samples: 0,
                    sums: vec![0.0; band_count],
                    counts: vec![0; band_count],
                });
                groups.len() - 1
            });

            let group = &mut groups[slot];
            group.lon += row.lon;
            group.lat += row.lat;
            group.samples += 1;
            for (band, value) in row.values.iter().enumerate().take(band_count) {
                if let Some(v) = value {
                    group.sums[band] += v;
                    group.counts[band] += 1;
                }
            }
        }

        let rows = groups
            .into_iter()
            .map(|g| ExtractRow {
                plot_id: g.plot_id,
                lon: g.lon / g.samples as f64,
                lat: g.lat / g.samples as f64,
                values: g
                    .sums
                    .iter()
                    .zip(&g.counts)
                    .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
                    .collect(),
            })
            .collect();

        ExtractTable {
            bands: self.bands.clone(),
            rows,
        }
    }
}

/// Resolves datasets and samples them at points, memoizing results
pub struct Extractor {
    chain: LoaderChain,
    cache: ExtractCache,
}

impl Extractor {
    pub fn new(chain: LoaderChain, cache: ExtractCache) -> Self {
        Self { chain, cache }
    }

    pub fn cache(&self) -> &ExtractCache {
        &self.cache
    }

    /// Extracts every band of `dataset_id` at the given WGS84 points
    pub fn extract(
        &self,
        dataset_id: &str,
        points: &[SampleRow],
        date_range: Option<DateRange>,
    ) -> Result<Arc<ExtractTable>> {
        let key = ExtractKey::new(dataset_id, points, date_range);
        if let Some(table) = self.cache.get(&key) {
            log::debug!("Cache hit for {} ({} points)", dataset_id, points.len());
            return Ok(table);
        }

        let (kind, image) = self.chain.load(dataset_id, date_range.as_ref())?;
        log::info!(
            "Extracting {} bands of {} {} at {} points",
            image.bands().len(),
            kind,
            dataset_id,
            points.len()
        );

        let table = Arc::new(sample_image(&image, points)?);
        self.cache.put(key, Arc::clone(&table));
        Ok(table)
    }
}

/// Looks up every point in the image, reprojecting when the image is not WGS84
pub fn sample_image(image: &GridImage, points: &[SampleRow]) -> Result<ExtractTable> {
    let transformer = if image.crs() == Crs::WGS84 {
        None
    } else {
        Some(Transformer::new(Crs::WGS84, image.crs())?)
    };

    let rows = points
        .iter()
        .map(|point| {
            let (x, y) = match &transformer {
                Some(t) => t.transform((point.lon, point.lat))?,
                None => (point.lon, point.lat),
            };

            Ok(ExtractRow {
                plot_id: point.plot_id.clone(),
                lon: point.lon,
                lat: point.lat,
                values: image.values_at(x, y),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExtractTable {
        bands: image.band_names(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::projection::epsg;

    fn row(plot_id: &str, lon: f64, lat: f64) -> SampleRow {
        SampleRow { plot_id: plot_id.to_string(), lon, lat }
    }

    fn extractor() -> Extractor {
        let mut catalog = Catalog::new();
        catalog.insert_image(
            "srtm",
            GridImage::new(2, 1, [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0], Crs::WGS84)
                .with_band("elevation", vec![310.0, 420.0])
                .unwrap(),
        );
        Extractor::new(Arc::new(catalog).loader_chain(), ExtractCache::new(8))
    }

    #[test]
    fn test_extract_values() {
        let points = [row("A", -84.5, 36.5), row("A", -83.5, 36.5), row("B", -80.0, 36.5)];
        let table = extractor().extract("srtm", &points, None).unwrap();

        assert_eq!(table.bands, vec!["elevation".to_string()]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].values, vec![Some(310.0)]);
        assert_eq!(table.rows[1].values, vec![Some(420.0)]);
        assert_eq!(table.rows[2].values, vec![None]);
        assert_eq!(table.rows[2].plot_id, "B");
    }

    #[test]
    fn test_cache_hit_returns_same_table() {
        let extractor = extractor();
        let points = [row("A", -84.5, 36.5)];

        let first = extractor.extract("srtm", &points, None).unwrap();
        let second = extractor.extract("srtm", &points, None).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(extractor.cache().len(), 1);
    }

    #[test]
    fn test_unknown_dataset() {
        let result = extractor().extract("nope", &[row("A", 0.0, 0.0)], None);
        assert!(matches!(result, Err(Error::RemoteLookupFailed { ref attempts, .. }) if attempts.len() == 3));
    }

    #[test]
    fn test_projected_image() {
        let utm = Crs::new(epsg::UTM_NORTH_BASE + 17);
        let (x, y) = Transformer::new(Crs::WGS84, utm).unwrap().transform((-84.0, 36.0)).unwrap();

        // 100 m cells centred on the point
        let image = GridImage::new(2, 2, [x - 100.0, 100.0, 0.0, y + 100.0, 0.0, -100.0], utm)
            .with_band("canopy", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();

        let table = sample_image(&image, &[row("A", -84.0, 36.0)]).unwrap();
        assert!(table.rows[0].values[0].is_some());
    }

    #[test]
    fn test_aggregate_by_plot() {
        let extract_row = |plot_id: &str, lon: f64, values: Vec<Option<f64>>| ExtractRow {
            plot_id: plot_id.to_string(),
            lon,
            lat: 36.0,
            values,
        };
        let table = ExtractTable {
            bands: vec!["elevation".to_string(), "ndvi".to_string()],
            rows: vec![
                extract_row("B", -84.0, vec![Some(100.0), None]),
                extract_row("A", -83.0, vec![Some(10.0), None]),
                extract_row("B", -82.0, vec![Some(200.0), Some(0.5)]),
                extract_row("A", -81.0, vec![None, None]),
                extract_row("B", -80.0, vec![None, Some(0.7)]),
            ],
        };

        let aggregated = table.aggregate_by_plot();
        assert_eq!(aggregated.bands, table.bands);
        assert_eq!(aggregated.rows.len(), 2);

        let b = &aggregated.rows[0];
        assert_eq!(b.plot_id, "B");
        assert!((b.lon - -82.0).abs() < 1e-12);
        assert_eq!(b.values[0], Some(150.0));
        assert!((b.values[1].unwrap() - 0.6).abs() < 1e-12);

        let a = &aggregated.rows[1];
        assert_eq!(a.plot_id, "A");
        assert_eq!(a.values, vec![Some(10.0), None]);
    }

    #[test]
    fn test_aggregate_empty_table() {
        let table = ExtractTable { bands: vec!["b1".to_string()], rows: Vec::new() };
        assert!(table.aggregate_by_plot().rows.is_empty());
    }

    #[test]
    fn test_table_csv() {
        let table = ExtractTable {
            bands: vec!["b1".to_string(), "b2".to_string()],
            rows: vec![ExtractRow {
                plot_id: "A".to_string(),
                lon: -84.5,
                lat: 36.5,
                values: vec![Some(1.5), None],
            }],
        };

        let csv = table.to_csv_string().unwrap();
        assert_eq!(csv, "plot_ID,lon,lat,b1,b2\nA,-84.5,36.5,1.5,\n");
    }
}
