// THEORY:
// The `point` module defines the two coordinate types the rest of the engine speaks.
//
// Key architectural principles:
// 1.  **Identity Travels With The Sample**: A `Point` is a LiDAR return (x, y, z)
//     plus the caller's record identifier. The identifier is opaque to this crate;
//     it is carried through untouched so a scored crown can be mapped back onto the
//     source cloud.
// 2.  **Planar Geometry**: Everything the shape tracker measures (hull, area,
//     distances) lives in the horizontal plane. `Point2` is that projection and is
//     the only type the hull ever stores.

use serde::{Deserialize, Serialize};

/// A single LiDAR return with its caller-assigned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Elevation.
    pub z: f64,
    /// Index of the source record. Never rewritten by this crate.
    pub id: usize,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64, id: usize) -> Self {
        Self { x, y, z, id }
    }

    /// Projection onto the horizontal plane.
    pub fn planar(&self) -> Point2 {
        Point2 { x: self.x, y: self.y }
    }

    /// Euclidean distance in the horizontal plane; elevation is ignored.
    pub fn planar_distance(&self, other: &Point) -> f64 {
        self.planar().distance(&other.planar())
    }
}

/// A vertex in the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<&Point> for Point2 {
    fn from(p: &Point) -> Self {
        p.planar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_distance_ignores_elevation() {
        let a = Point::new(0.0, 0.0, 0.0, 0);
        let b = Point::new(3.0, 4.0, 100.0, 1);
        assert!((a.planar_distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn projection_keeps_x_and_y() {
        let p = Point::new(1.5, -2.0, 7.0, 42);
        assert_eq!(Point2::from(&p), Point2::new(1.5, -2.0));
    }
}
