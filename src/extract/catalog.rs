use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use geo::{Contains, Point, Polygon};

use crate::extract::image::{median, GridImage};
use crate::extract::loader::{DatasetKind, DatasetLoader, DateRange, LoadError, LoaderChain};

/// An image stamped with its acquisition date
#[derive(Debug, Clone)]
pub struct DatedImage {
    pub date: NaiveDate,
    pub image: GridImage,
}

/// A polygon with numeric properties
#[derive(Debug, Clone)]
pub struct Feature {
    pub polygon: Polygon<f64>,
    pub properties: BTreeMap<String, f64>,
}

/// Vector features plus the grid they are rasterized onto
#[derive(Debug, Clone)]
pub struct FeatureLayer {
    pub grid: GridImage,
    pub features: Vec<Feature>,
}

impl FeatureLayer {
    /// Burns feature properties into a grid, one band per property name
    ///
    /// A cell takes the median property value of the features containing its
    /// center, or no data when none do.
    pub fn rasterize(&self) -> crate::Result<GridImage> {
        let names: BTreeSet<&String> = self.features.iter().flat_map(|f| f.properties.keys()).collect();
        let width = self.grid.width();
        let height = self.grid.height();

        let centers: Vec<Point<f64>> = (0..height)
            .flat_map(|row| (0..width).map(move |col| (col, row)))
            .map(|(col, row)| {
                let (x, y) = self.grid.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
                Point::new(x, y)
            })
            .collect();

        let mut image = GridImage::new(width, height, self.grid.geo_transform(), self.grid.crs());
        let mut hits = Vec::new();

        for name in names {
            let values = centers
                .iter()
                .map(|center| {
                    hits.clear();
                    hits.extend(
                        self.features
                            .iter()
                            .filter(|f| f.polygon.contains(center))
                            .filter_map(|f| f.properties.get(name).copied()),
                    );
                    median(&mut hits)
                })
                .collect();
            image = image.with_band(name.clone(), values)?;
        }

        Ok(image)
    }
}

/// In-process dataset store keyed by dataset identifier
#[derive(Debug, Default)]
pub struct Catalog {
    images: HashMap<String, GridImage>,
    collections: HashMap<String, Vec<DatedImage>>,
    features: HashMap<String, FeatureLayer>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, id: impl Into<String>, image: GridImage) {
        self.images.insert(id.into(), image);
    }

    pub fn insert_collection(&mut self, id: impl Into<String>, images: Vec<DatedImage>) {
        self.collections.insert(id.into(), images);
    }

    pub fn insert_features(&mut self, id: impl Into<String>, layer: FeatureLayer) {
        self.features.insert(id.into(), layer);
    }

    /// Number of datasets across all kinds
    pub fn len(&self) -> usize {
        self.images.len() + self.collections.len() + self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves the catalog behind an `Arc` and builds its loader chain
    pub fn into_loader_chain(self) -> LoaderChain {
        Arc::new(self).loader_chain()
    }

    /// Image, then ImageCollection, then FeatureCollection
    pub fn loader_chain(self: &Arc<Self>) -> LoaderChain {
        LoaderChain::new()
            .with_loader(ImageLoader { catalog: Arc::clone(self) })
            .with_loader(CollectionLoader { catalog: Arc::clone(self) })
            .with_loader(FeatureLoader { catalog: Arc::clone(self) })
    }
}

/// Loads single images; date ranges do not apply
pub struct ImageLoader {
    catalog: Arc<Catalog>,
}

impl DatasetLoader for ImageLoader {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Image
    }

    fn load(&self, dataset_id: &str, _range: Option<&DateRange>) -> Result<GridImage, LoadError> {
        self.catalog
            .images
            .get(dataset_id)
            .cloned()
            .ok_or(LoadError::NotFound(DatasetKind::Image))
    }
}

/// Loads image collections as a median composite of the images in range
pub struct CollectionLoader {
    catalog: Arc<Catalog>,
}

impl DatasetLoader for CollectionLoader {
    fn kind(&self) -> DatasetKind {
        DatasetKind::ImageCollection
    }

    fn load(&self, dataset_id: &str, range: Option<&DateRange>) -> Result<GridImage, LoadError> {
        let collection = self
            .catalog
            .collections
            .get(dataset_id)
            .ok_or(LoadError::NotFound(DatasetKind::ImageCollection))?;

        let selected: Vec<GridImage> = collection
            .iter()
            .filter(|dated| range.map_or(true, |r| r.contains(dated.date)))
            .map(|dated| dated.image.clone())
            .collect();

        if selected.is_empty() {
            return Err(LoadError::Empty {
                kind: DatasetKind::ImageCollection,
                range: range.copied(),
            });
        }

        GridImage::median_composite(&selected).map_err(|e| LoadError::Invalid {
            kind: DatasetKind::ImageCollection,
            reason: e.to_string(),
        })
    }
}

/// Loads feature collections by rasterizing their properties
pub struct FeatureLoader {
    catalog: Arc<Catalog>,
}

impl DatasetLoader for FeatureLoader {
    fn kind(&self) -> DatasetKind {
        DatasetKind::FeatureCollection
    }

    fn load(&self, dataset_id: &str, _range: Option<&DateRange>) -> Result<GridImage, LoadError> {
        let layer = self
            .catalog
            .features
            .get(dataset_id)
            .ok_or(LoadError::NotFound(DatasetKind::FeatureCollection))?;

        if layer.features.is_empty() {
            return Err(LoadError::Empty {
                kind: DatasetKind::FeatureCollection,
                range: None,
            });
        }

        layer.rasterize().map_err(|e| LoadError::Invalid {
            kind: DatasetKind::FeatureCollection,
            reason: e.to_string(),
        })
    }
}
