use std::f64::consts::TAU;

use geo::{LineString, Point, Polygon};
use rand::Rng;

use crate::sampler::rejection::random_points_in_polygon;
use crate::types::ProjectedPoint;

/// A disk containing, but not centered on, an obfuscated point
#[derive(Debug, Clone)]
pub struct ObfuscationDisk {
    center: ProjectedPoint,
    radius_m: f64,
    polygon: Polygon<f64>,
}

impl ObfuscationDisk {
    /// Places a disk of `radius_m` so that `origin` sits at a random offset inside it
    ///
    /// The center is `distance` meters from the origin in direction `angle + π`,
    /// with `angle ~ U(0, 2π)` and `distance ~ U(0, radius_m)`.
    pub fn around<R: Rng>(rng: &mut R, origin: &ProjectedPoint, radius_m: f64, segments: usize) -> Self {
        let angle = rng.random_range(0.0..TAU);
        let distance = rng.random_range(0.0..radius_m);

        let center = ProjectedPoint::new(
            origin.x - distance * angle.cos(),
            origin.y - distance * angle.sin(),
            origin.crs,
        );

        Self::centered(center, radius_m, segments)
    }

    /// Builds a disk at a known center
    pub fn centered(center: ProjectedPoint, radius_m: f64, segments: usize) -> Self {
        Self {
            polygon: circle_polygon(center.x, center.y, radius_m, segments),
            center,
            radius_m,
        }
    }

    pub fn center(&self) -> ProjectedPoint {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Draws `count` uniform points inside the disk polygon
    ///
    /// `None` when the polygon collapsed to zero area.
    pub fn sample<R: Rng>(&self, rng: &mut R, count: usize) -> Option<Vec<ProjectedPoint>> {
        let points = random_points_in_polygon(rng, &self.polygon, count)?;
        Some(
            points
                .into_iter()
                .map(|p: Point<f64>| ProjectedPoint::new(p.x(), p.y(), self.center.crs))
                .collect(),
        )
    }
}

/// Regular polygon with `segments` vertices on a circle
pub fn circle_polygon(cx: f64, cy: f64, radius: f64, segments: usize) -> Polygon<f64> {
    let ring: Vec<(f64, f64)> = (0..segments)
        .map(|i| {
            let theta = TAU * i as f64 / segments as f64;
            (cx + radius * theta.cos(), cy + radius * theta.sin())
        })
        .collect();

    Polygon::new(LineString::from(ring), vec![])
}
