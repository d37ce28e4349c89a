// THEORY:
// The `ShapeTracker` is the stateful heart of crown evaluation. One tracker follows one
// candidate crown while the segmentation grows it, point by point, and keeps the
// planar descriptors the scoring engine needs up to date.
//
// Key architectural principles:
// 1.  **Append-Only Memory**: Points are only ever added. The tracker keeps every
//     point (centroid and elevation queries need them) but its hull only grows.
// 2.  **Hull-From-Previous-Hull**: A new point either falls on or inside the current
//     hull, in which case nothing but the point list changes, or it lies outside and
//     the new hull is built from the previous hull's vertices plus that point. A point
//     that is interior once stays interior forever, so discarding interior points
//     keeps the cost of an update bounded by the hull size, not the crown size.
// 3.  **Two Regimes**: Below three points there is no area. A two-point crown is
//     described by the planar distance between its points; from three points on, the
//     hull area takes over and the pair distance is reset.
// 4.  **Elevation On Demand**: The highest and lowest points are found by sorting
//     the crown by elevation every time they are asked for. Nothing is cached, so
//     nothing can go stale; callers pay O(n log n) per query and should not ask in a
//     hot loop.
// 5.  **Single Owner**: A tracker has no interior synchronisation. Independent
//     trackers share nothing and can be driven on independent tasks.

use crate::core_modules::hull;
use crate::core_modules::point::{Point, Point2};
use crate::core_modules::scoring::ShapeScores;
use tracing::{trace, warn};

/// The incremental shape state of a single candidate crown.
#[derive(Debug, Clone, Default)]
pub struct ShapeTracker {
    /// Every point added so far, in arrival order.
    points: Vec<Point>,
    /// Always equal to `points.len()`.
    count: usize,
    /// Current convex hull of the planar projection (open CCW ring).
    hull: Vec<Point2>,
    /// Snapshot of `hull` taken whenever the area was last recomputed.
    hull_vertices: Vec<Point2>,
    /// Hull area; zero while fewer than three points exist.
    area: f64,
    /// Absolute area change caused by the latest hull update.
    area_delta: f64,
    /// Planar distance between the two points of a two-point crown.
    pair_distance: f64,
    /// Planar position of the very first point.
    apex: Option<Point2>,
    /// Latest output of the scoring engine.
    pub(crate) scores: ShapeScores,
}

impl ShapeTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker seeded with its first point, which becomes the apex.
    pub fn seeded(pt: Point) -> Self {
        let apex = pt.planar();
        Self {
            points: vec![pt],
            count: 1,
            hull: vec![apex],
            apex: Some(apex),
            ..Self::default()
        }
    }

    /// Adds a point to the crown and updates the hull and its descriptors.
    pub fn add_point(&mut self, pt: Point) {
        self.count += 1;
        self.points.push(pt);
        if self.apex.is_none() {
            self.apex = Some(pt.planar());
        }

        let p = pt.planar();
        if hull::covered_by(&self.hull, &p) {
            return;
        }

        self.hull = hull::extend(&self.hull, p);
        trace!(id = pt.id, hull_size = self.hull.len(), "hull grew");
        self.refresh_descriptors();
    }

    fn refresh_descriptors(&mut self) {
        if self.count >= 3 {
            let previous = self.area;
            let current = hull::polygon_area(&self.hull);
            self.area_delta = (current - previous).abs();
            self.area = current;
            self.hull_vertices = self.hull.clone();
            self.pair_distance = 0.0;
        } else if self.count == 2 {
            self.pair_distance = self.points[0].planar_distance(&self.points[1]);
        }
    }

    /// Area change that adding `pt` would cause, without adding it.
    pub fn test_area(&self, pt: &Point) -> f64 {
        let p = pt.planar();
        if hull::covered_by(&self.hull, &p) {
            return 0.0;
        }
        let provisional = hull::extend(&self.hull, p);
        (hull::polygon_area(&provisional) - self.area).abs()
    }

    /// Planar distance from `pt` to the nearest point of the crown.
    ///
    /// Ties go to the earliest inserted point. `None` for an empty tracker.
    pub fn test_distance(&self, pt: &Point) -> Option<f64> {
        let mut nearest: Option<f64> = None;
        for member in &self.points {
            let d = member.planar_distance(pt);
            match nearest {
                Some(best) if best <= d => {}
                _ => nearest = Some(d),
            }
        }
        nearest
    }

    /// The point with the greatest elevation, first inserted among equals.
    ///
    /// Sorts the whole crown on every call.
    pub fn highest_point(&self) -> Option<&Point> {
        let mut by_elevation: Vec<&Point> = self.points.iter().collect();
        by_elevation.sort_by(|a, b| b.z.total_cmp(&a.z));
        by_elevation.first().copied()
    }

    /// The smallest elevation in the crown. Sorts the whole crown on every call.
    pub fn lowest_elevation(&self) -> Option<f64> {
        let mut elevations: Vec<f64> = self.points.iter().map(|p| p.z).collect();
        elevations.sort_by(|a, b| a.total_cmp(b));
        elevations.first().copied()
    }

    /// Recomputes hull, area and pair distance from every point, ignoring the
    /// incremental state. `area_delta` is left untouched.
    pub fn rebuild(&mut self) {
        let planar: Vec<Point2> = self.points.iter().map(Point::planar).collect();
        self.hull = hull::convex_hull(&planar);
        if self.count >= 3 {
            self.area = hull::polygon_area(&self.hull);
            self.hull_vertices = self.hull.clone();
            self.pair_distance = 0.0;
        } else if self.count == 2 {
            self.pair_distance = self.points[0].planar_distance(&self.points[1]);
        }
    }

    /// Absorbs every point of `other`, then rebuilds the hull from scratch.
    pub fn merge(&mut self, other: &ShapeTracker) {
        if self.apex.is_none() {
            self.apex = other.apex;
        }
        self.points.extend_from_slice(&other.points);
        self.count = self.points.len();
        self.rebuild();
    }

    /// Writes `crown_index` into `labels[id]` for every member point that is still
    /// unlabelled (0). Existing labels are never overwritten.
    pub fn label_points(&self, labels: &mut [u32], crown_index: u32) {
        for pt in &self.points {
            match labels.get_mut(pt.id) {
                Some(label) if *label == 0 => *label = crown_index,
                Some(_) => {}
                None => warn!(id = pt.id, len = labels.len(), "point id outside label range"),
            }
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// The current hull ring.
    pub fn hull(&self) -> &[Point2] {
        &self.hull
    }

    pub fn hull_vertices(&self) -> &[Point2] {
        &self.hull_vertices
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn area_delta(&self) -> f64 {
        self.area_delta
    }

    pub fn pair_distance(&self) -> f64 {
        self.pair_distance
    }

    pub fn apex(&self) -> Option<Point2> {
        self.apex
    }

    /// Scores from the last call to [`ShapeTracker::score`].
    pub fn scores(&self) -> &ShapeScores {
        &self.scores
    }
}
