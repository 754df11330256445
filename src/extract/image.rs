use crate::error::{Error, Result};
use crate::projection::Crs;

/// One named band of a [`GridImage`], row-major, NaN marking no data
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub values: Vec<f64>,
}

/// A gridded multi-band image with a GDAL-style affine geotransform
///
/// `geo_transform` is `[origin_x, pixel_width, row_rotation, origin_y,
/// column_rotation, pixel_height]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridImage {
    width: usize,
    height: usize,
    geo_transform: [f64; 6],
    crs: Crs,
    bands: Vec<Band>,
}

impl GridImage {
    /// Creates an image without bands
    pub fn new(width: usize, height: usize, geo_transform: [f64; 6], crs: Crs) -> Self {
        Self {
            width,
            height,
            geo_transform,
            crs,
            bands: Vec::new(),
        }
    }

    /// Adds a band, which must hold exactly `width * height` values
    pub fn with_band(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.width * self.height {
            return Err(Error::InvalidFormat(format!(
                "Band {} has {} values, expected {}x{}",
                name,
                values.len(),
                self.width,
                self.height
            )));
        }
        self.bands.push(Band { name, values });
        Ok(self)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn geo_transform(&self) -> [f64; 6] {
        self.geo_transform
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.name.clone()).collect()
    }

    /// Converts pixel coordinates (cell corner) to CRS coordinates
    pub fn pixel_to_geo(&self, pixel_x: f64, pixel_y: f64) -> (f64, f64) {
        let t = self.geo_transform;
        (
            t[0] + t[1] * pixel_x + t[2] * pixel_y,
            t[3] + t[4] * pixel_x + t[5] * pixel_y,
        )
    }

    /// Converts CRS coordinates to fractional pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let t = self.geo_transform;

        let det = t[1] * t[5] - t[2] * t[4];
        if det.abs() < 1e-10 {
            return None;
        }

        let dx = x - t[0];
        let dy = y - t[3];

        let pixel_x = (t[5] * dx - t[2] * dy) / det;
        let pixel_y = (-t[4] * dx + t[1] * dy) / det;

        Some((pixel_x, pixel_y))
    }

    /// Returns the cell covering a CRS coordinate, if inside the grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (px, py) = self.geo_to_pixel(x, y)?;
        if px < 0.0 || py < 0.0 || px >= self.width as f64 || py >= self.height as f64 {
            return None;
        }
        Some((px as usize, py as usize))
    }

    /// Value of every band at a CRS coordinate; `None` outside the grid or for no data
    pub fn values_at(&self, x: f64, y: f64) -> Vec<Option<f64>> {
        match self.cell_at(x, y) {
            Some((col, row)) => {
                let index = row * self.width + col;
                self.bands
                    .iter()
                    .map(|b| Some(b.values[index]).filter(|v| !v.is_nan()))
                    .collect()
            }
            None => vec![None; self.bands.len()],
        }
    }

    /// Per-pixel median of a stack of images on the same grid
    pub fn median_composite(images: &[GridImage]) -> Result<GridImage> {
        let first = images
            .first()
            .ok_or_else(|| Error::InvalidFormat("Cannot composite an empty image stack".to_string()))?;

        for image in &images[1..] {
            if image.width != first.width
                || image.height != first.height
                || image.geo_transform != first.geo_transform
                || image.crs != first.crs
                || image.band_names() != first.band_names()
            {
                return Err(Error::InvalidFormat(
                    "Composite images must share grid, CRS and bands".to_string(),
                ));
            }
        }

        let mut composite = GridImage::new(first.width, first.height, first.geo_transform, first.crs);
        let mut stack = Vec::with_capacity(images.len());

        for (band_index, band) in first.bands.iter().enumerate() {
            let values = (0..first.width * first.height)
                .map(|cell| {
                    stack.clear();
                    stack.extend(
                        images
                            .iter()
                            .map(|img| img.bands[band_index].values[cell])
                            .filter(|v| !v.is_nan()),
                    );
                    median(&mut stack)
                })
                .collect();
            composite.bands.push(Band {
                name: band.name.clone(),
                values,
            });
        }

        Ok(composite)
    }
}

/// Median of the values, NaN when empty
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3x2 grid of 1-degree cells with its top-left corner at (-85, 37)
    fn grid(values: Vec<f64>) -> GridImage {
        GridImage::new(3, 2, [-85.0, 1.0, 0.0, 37.0, 0.0, -1.0], Crs::WGS84)
            .with_band("elevation", values)
            .unwrap()
    }

    #[test]
    fn test_band_length_checked() {
        let result = GridImage::new(2, 2, [0.0, 1.0, 0.0, 0.0, 0.0, -1.0], Crs::WGS84).with_band("b", vec![1.0]);
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_geo_pixel_roundtrip() {
        let image = grid(vec![0.0; 6]);
        let (x, y) = image.pixel_to_geo(1.5, 0.5);
        assert_eq!((x, y), (-83.5, 36.5));

        let (px, py) = image.geo_to_pixel(x, y).unwrap();
        assert!((px - 1.5).abs() < 1e-12);
        assert!((py - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_singular_transform() {
        let image = GridImage::new(1, 1, [0.0, 0.0, 0.0, 0.0, 0.0, 0.0], Crs::WGS84);
        assert!(image.geo_to_pixel(1.0, 1.0).is_none());
    }

    #[test]
    fn test_values_at() {
        let image = grid(vec![1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0]);

        assert_eq!(image.values_at(-84.5, 36.5), vec![Some(1.0)]);
        assert_eq!(image.values_at(-82.5, 35.5), vec![Some(6.0)]);
        assert_eq!(image.values_at(-83.5, 35.5), vec![None]);
        assert_eq!(image.values_at(-90.0, 36.5), vec![None]);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&mut []).is_nan());
    }

    #[test]
    fn test_median_composite() {
        let images = vec![
            grid(vec![1.0, 10.0, f64::NAN, 0.0, 0.0, 0.0]),
            grid(vec![2.0, 20.0, f64::NAN, 0.0, 0.0, 0.0]),
            grid(vec![9.0, 30.0, 5.0, 0.0, 0.0, 0.0]),
        ];

        let composite = GridImage::median_composite(&images).unwrap();
        let values = &composite.bands()[0].values;
        assert_eq!(values[0], 2.0);
        assert_eq!(values[1], 20.0);
        assert_eq!(values[2], 5.0);
    }

    #[test]
    fn test_composite_rejects_mismatched_grids() {
        let other = GridImage::new(3, 2, [0.0, 1.0, 0.0, 0.0, 0.0, -1.0], Crs::WGS84)
            .with_band("elevation", vec![0.0; 6])
            .unwrap();
        assert!(GridImage::median_composite(&[grid(vec![0.0; 6]), other]).is_err());
        assert!(GridImage::median_composite(&[]).is_err());
    }
}
