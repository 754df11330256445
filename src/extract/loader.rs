use std::fmt;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::extract::image::GridImage;

/// The shapes a dataset identifier can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Image,
    ImageCollection,
    FeatureCollection,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Image => "Image",
            DatasetKind::ImageCollection => "ImageCollection",
            DatasetKind::FeatureCollection => "FeatureCollection",
        };
        f.write_str(name)
    }
}

/// Inclusive date filter for time-indexed datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidFormat(format!(
                "Date range starts after it ends: {} > {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses two `YYYY-MM-DD` dates
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| Error::InvalidFormat(format!("Invalid date {:?}: {}", s, e)))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Why one loader could not produce an image
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// The identifier does not name a dataset of this kind
    NotFound(DatasetKind),
    /// The dataset exists but nothing remained after date filtering
    Empty { kind: DatasetKind, range: Option<DateRange> },
    /// The dataset exists but could not be turned into an image
    Invalid { kind: DatasetKind, reason: String },
}

impl LoadError {
    pub fn kind(&self) -> DatasetKind {
        match self {
            LoadError::NotFound(kind) => *kind,
            LoadError::Empty { kind, .. } => *kind,
            LoadError::Invalid { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(kind) => write!(f, "{}: not found", kind),
            LoadError::Empty { kind, range: Some(range) } => {
                write!(f, "{}: no images in {}", kind, range)
            }
            LoadError::Empty { kind, range: None } => write!(f, "{}: no images", kind),
            LoadError::Invalid { kind, reason } => write!(f, "{}: {}", kind, reason),
        }
    }
}

impl std::error::Error for LoadError {}

/// Resolves a dataset identifier as one particular [`DatasetKind`]
pub trait DatasetLoader: Send + Sync {
    fn kind(&self) -> DatasetKind;

    fn load(&self, dataset_id: &str, range: Option<&DateRange>) -> std::result::Result<GridImage, LoadError>;
}

/// Loaders tried in order until one succeeds
pub struct LoaderChain {
    loaders: Vec<Box<dyn DatasetLoader>>,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Appends a loader to the end of the chain
    pub fn with_loader<L: DatasetLoader + 'static>(mut self, loader: L) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn kinds(&self) -> Vec<DatasetKind> {
        self.loaders.iter().map(|l| l.kind()).collect()
    }

    /// Loads the dataset with the first loader that accepts it
    ///
    /// Fails with [`Error::RemoteLookupFailed`] listing every attempt when no
    /// loader succeeds.
    pub fn load(&self, dataset_id: &str, range: Option<&DateRange>) -> Result<(DatasetKind, GridImage)> {
        let mut attempts = Vec::with_capacity(self.loaders.len());

        for loader in &self.loaders {
            match loader.load(dataset_id, range) {
                Ok(image) => {
                    log::debug!("Loaded {} as {}", dataset_id, loader.kind());
                    return Ok((loader.kind(), image));
                }
                Err(e) => {
                    log::debug!("Loading {} failed: {}", dataset_id, e);
                    attempts.push(e);
                }
            }
        }

        Err(Error::RemoteLookupFailed {
            dataset: dataset_id.to_string(),
            attempts,
        })
    }
}

impl Default for LoaderChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Crs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        kind: DatasetKind,
        accepts: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl DatasetLoader for Fixed {
        fn kind(&self) -> DatasetKind {
            self.kind
        }

        fn load(&self, dataset_id: &str, _range: Option<&DateRange>) -> std::result::Result<GridImage, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if dataset_id == self.accepts {
                Ok(GridImage::new(1, 1, [0.0, 1.0, 0.0, 0.0, 0.0, -1.0], Crs::WGS84))
            } else {
                Err(LoadError::NotFound(self.kind))
            }
        }
    }

    fn chain(calls: &Arc<AtomicUsize>) -> LoaderChain {
        LoaderChain::new()
            .with_loader(Fixed { kind: DatasetKind::Image, accepts: "img", calls: calls.clone() })
            .with_loader(Fixed { kind: DatasetKind::ImageCollection, accepts: "col", calls: calls.clone() })
            .with_loader(Fixed { kind: DatasetKind::FeatureCollection, accepts: "fc", calls: calls.clone() })
    }

    #[test]
    fn test_first_success_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (kind, _) = chain(&calls).load("img", None).unwrap();
        assert_eq!(kind, DatasetKind::Image);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_falls_through_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (kind, _) = chain(&calls).load("fc", None).unwrap();
        assert_eq!(kind, DatasetKind::FeatureCollection);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_all_failures_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        match chain(&calls).load("missing", None) {
            Err(Error::RemoteLookupFailed { dataset, attempts }) => {
                assert_eq!(dataset, "missing");
                let kinds: Vec<_> = attempts.iter().map(|a| a.kind()).collect();
                assert_eq!(
                    kinds,
                    [DatasetKind::Image, DatasetKind::ImageCollection, DatasetKind::FeatureCollection]
                );
            }
            other => panic!("unexpected result: {:?}", other.map(|(k, _)| k)),
        }
    }

    #[test]
    fn test_empty_chain() {
        let result = LoaderChain::default().load("anything", None);
        assert!(matches!(result, Err(Error::RemoteLookupFailed { ref attempts, .. }) if attempts.is_empty()));
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::parse("2020-01-01", "2020-12-31").unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()));
        assert_eq!(range.to_string(), "2020-01-01..2020-12-31");

        assert!(DateRange::parse("2021-01-01", "2020-01-01").is_err());
        assert!(DateRange::parse("yesterday", "2020-01-01").is_err());
    }
}
