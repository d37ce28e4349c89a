// THEORY:
// The scoring engine turns a tracker's current shape into four independent crown
// heuristics and their mean. Each heuristic is a pure function of `&ShapeTracker`;
// only `ShapeTracker::score` writes, and it writes nothing but the score block.
//
// The four heuristics:
// 1.  **Size**: is the crown dense and large enough for a tree of its height?
//     Compares the point count to `k · density · ln(height)`.
// 2.  **Orientation**: is the highest point near the planar centre of the crown?
// 3.  **Regularity**: how much of the circle reaching the 95th-percentile hull
//     vertex (seen from the highest point) does the hull actually fill?
// 4.  **Circularity**: ratio of the major to the minor semi-axis of the fitted
//     principal-axis ellipse. This one is >= 1 and unbounded; the global score is the
//     plain mean of all four, so an elongated crown can lift the global score above 1.
//
// Area-based heuristics need a real polygon (non-zero area, more than two points,
// more than two hull vertices) and are 0 otherwise.

use crate::core_modules::ellipse;
use crate::core_modules::point::Point2;
use crate::core_modules::shape_tracker::ShapeTracker;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Rank used to pick the effective crown radius among hull-vertex distances.
const RADIUS_PERCENTILE: f64 = 0.95;

/// The score block kept on every tracker.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeScores {
    pub size: f64,
    pub orientation: f64,
    pub circularity: f64,
    pub regularity: f64,
    /// Mean of the four scores above.
    pub global: f64,
}

impl ShapeScores {
    fn finalize(&mut self) {
        self.global = (self.size + self.orientation + self.regularity + self.circularity) / 4.0;
    }
}

fn has_polygon(tracker: &ShapeTracker) -> bool {
    tracker.area() != 0.0 && tracker.count() > 2 && tracker.hull_vertices().len() > 2
}

/// Size/density score for a neighbourhood size `k`.
///
/// Returns 0 when the density is undefined (no area and no pair distance) or when
/// the highest elevation is negative.
pub fn size_score(tracker: &ShapeTracker, k: u32) -> f64 {
    let Some(highest) = tracker.highest_point() else {
        return 0.0;
    };
    let n = tracker.count() as f64;
    let density = if tracker.area() != 0.0 {
        n / tracker.area()
    } else if tracker.pair_distance() != 0.0 {
        n / tracker.pair_distance()
    } else {
        return 0.0;
    };

    let threshold = k as f64 * density * highest.z.ln();
    if threshold.is_nan() {
        return 0.0;
    }
    if n > threshold { 1.0 } else { n / threshold }
}

/// Orientation score: 1 when the highest point sits on the planar centroid, falling
/// to 0 once it is half the mean apex-to-hull distance away.
pub fn orientation_score(tracker: &ShapeTracker) -> f64 {
    if !has_polygon(tracker) {
        return 0.0;
    }
    let Some(highest) = tracker.highest_point() else {
        return 0.0;
    };
    let top = highest.planar();

    let n = tracker.count() as f64;
    let centroid = Point2::new(
        tracker.points().iter().map(|p| p.x).sum::<f64>() / n,
        tracker.points().iter().map(|p| p.y).sum::<f64>() / n,
    );
    let dist_mg = top.distance(&centroid);

    // Measured from the highest point, not the centroid.
    let vertices = tracker.hull_vertices();
    let dist_gch =
        vertices.iter().map(|v| top.distance(v)).sum::<f64>() / vertices.len() as f64;

    if dist_mg <= dist_gch / 2.0 {
        1.0 - 2.0 * (dist_mg / dist_gch)
    } else {
        0.0
    }
}

/// Circularity score: major over minor semi-axis of the fitted ellipse.
pub fn circularity_score(tracker: &ShapeTracker) -> f64 {
    if !has_polygon(tracker) {
        return 0.0;
    }
    match ellipse::fit_principal_axes(tracker.hull_vertices()) {
        Some(axes) if axes.minor() != 0.0 => axes.major() / axes.minor(),
        _ => 0.0,
    }
}

/// Regularity score: hull area over the area of the circle whose radius is the
/// 95th-percentile distance from the highest point to the hull vertices.
pub fn regularity_score(tracker: &ShapeTracker) -> f64 {
    if !has_polygon(tracker) {
        return 0.0;
    }
    let Some(highest) = tracker.highest_point() else {
        return 0.0;
    };
    let top = highest.planar();

    let mut distances: Vec<f64> = tracker
        .hull_vertices()
        .iter()
        .map(|v| top.distance(v))
        .collect();
    distances.sort_by(|a, b| a.total_cmp(b));

    let rank = (distances.len() as f64 * RADIUS_PERCENTILE).ceil() as usize;
    let radius = distances[rank.clamp(1, distances.len()) - 1];
    if radius == 0.0 {
        return 0.0;
    }
    tracker.area() / (PI * radius * radius)
}

impl ShapeTracker {
    /// Refreshes every score (size, orientation, regularity, then circularity and the
    /// global mean) and returns a copy of the result.
    pub fn score(&mut self, k: u32) -> ShapeScores {
        let mut scores = ShapeScores {
            size: size_score(self, k),
            orientation: orientation_score(self),
            regularity: regularity_score(self),
            circularity: circularity_score(self),
            global: 0.0,
        };
        scores.finalize();
        debug!(
            count = self.count(),
            area = self.area(),
            global = scores.global,
            "crown scored"
        );
        self.scores = scores;
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::point::Point;
    use approx::assert_relative_eq;

    /// A regular polygon of `n` points at elevation 1 around a central peak.
    fn crown(n: usize, radius: f64, peak: f64) -> ShapeTracker {
        let mut tracker = ShapeTracker::seeded(Point::new(0.0, 0.0, peak, 0));
        for i in 0..n {
            let a = 2.0 * PI * i as f64 / n as f64;
            tracker.add_point(Point::new(radius * a.cos(), radius * a.sin(), 1.0, i + 1));
        }
        tracker
    }

    #[test]
    fn few_points_score_zero_on_shape() {
        let mut tracker = ShapeTracker::seeded(Point::new(0.0, 0.0, 10.0, 0));
        tracker.add_point(Point::new(1.0, 0.0, 8.0, 1));
        for k in [1, 4, 12] {
            let scores = tracker.score(k);
            assert_eq!(scores.orientation, 0.0);
            assert_eq!(scores.circularity, 0.0);
            assert_eq!(scores.regularity, 0.0);
        }
    }

    #[test]
    fn coincident_pair_has_zero_size_score() {
        let mut tracker = ShapeTracker::seeded(Point::new(1.0, 1.0, 10.0, 0));
        tracker.add_point(Point::new(1.0, 1.0, 9.0, 1));
        assert_eq!(size_score(&tracker, 4), 0.0);
        assert_eq!(size_score(&ShapeTracker::new(), 4), 0.0);
    }

    #[test]
    fn pair_uses_distance_as_density() {
        let mut tracker = ShapeTracker::seeded(Point::new(0.0, 0.0, 10.0, 0));
        tracker.add_point(Point::new(4.0, 0.0, 8.0, 1));
        // density = 2 / 4, threshold = 3 * 0.5 * ln(10)
        let threshold = 1.5 * 10.0_f64.ln();
        assert_relative_eq!(size_score(&tracker, 3), 2.0 / threshold);
    }

    #[test]
    fn size_score_saturates() {
        let tracker = crown(8, 1.0, 10.0);
        assert_eq!(size_score(&tracker, 1), 1.0);
        let density = 9.0 / tracker.area();
        let threshold = 4.0 * density * 10.0_f64.ln();
        assert_relative_eq!(size_score(&tracker, 4), 9.0 / threshold);
    }

    #[test]
    fn centred_peak_is_well_oriented() {
        let tracker = crown(8, 1.0, 10.0);
        assert_relative_eq!(orientation_score(&tracker), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn peak_on_the_rim_is_badly_oriented() {
        let mut tracker = crown(8, 1.0, 10.0);
        tracker.add_point(Point::new(1.0, 0.0, 30.0, 99));
        assert_eq!(orientation_score(&tracker), 0.0);
    }

    #[test]
    fn regular_polygon_is_circular() {
        let tracker = crown(8, 2.5, 10.0);
        assert_relative_eq!(circularity_score(&tracker), 1.0, epsilon = 1e-6);
        let tracker = crown(32, 2.5, 10.0);
        assert_relative_eq!(circularity_score(&tracker), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn elongated_crown_has_large_ratio() {
        let mut tracker = ShapeTracker::seeded(Point::new(0.0, 0.0, 10.0, 0));
        tracker.add_point(Point::new(6.0, 0.0, 5.0, 1));
        tracker.add_point(Point::new(6.0, 2.0, 5.0, 2));
        tracker.add_point(Point::new(0.0, 2.0, 5.0, 3));
        assert_relative_eq!(circularity_score(&tracker), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn regularity_of_octagon() {
        let tracker = crown(8, 1.0, 10.0);
        let octagon_area = 2.0 * 2.0_f64.sqrt();
        assert_relative_eq!(regularity_score(&tracker), octagon_area / PI, epsilon = 1e-9);
    }

    #[test]
    fn score_stores_mean_of_four() {
        let mut tracker = crown(8, 1.0, 10.0);
        let scores = tracker.score(4);
        let mean = (scores.size + scores.orientation + scores.circularity + scores.regularity) / 4.0;
        assert_relative_eq!(scores.global, mean);
        assert_eq!(tracker.scores(), &scores);
    }
}
