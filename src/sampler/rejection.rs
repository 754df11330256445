use geo::{Area, BoundingRect, Contains, Point, Polygon, Rect};
use rand::Rng;

/// Draws a uniform point inside `bounds`
pub fn random_point_in_rect<R: Rng>(rng: &mut R, bounds: &Rect<f64>) -> Point<f64> {
    let x = rng.random_range(bounds.min().x..bounds.max().x);
    let y = rng.random_range(bounds.min().y..bounds.max().y);
    Point::new(x, y)
}

/// Draws `count` uniform points inside `polygon` by bounding-box rejection
///
/// Returns `None` when the polygon has no area, since no draw could ever land
/// inside it.
pub fn random_points_in_polygon<R: Rng>(
    rng: &mut R,
    polygon: &Polygon<f64>,
    count: usize,
) -> Option<Vec<Point<f64>>> {
    let bounds = polygon.bounding_rect()?;
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 || polygon.unsigned_area() <= 0.0 {
        return None;
    }

    let mut points = Vec::with_capacity(count);
    while points.len() < count {
        let candidate = random_point_in_rect(rng, &bounds);
        if polygon.contains(&candidate) {
            points.push(candidate);
        }
    }

    Some(points)
}
