// THEORY:
// The `hull` module holds the planar convex-hull primitives the `ShapeTracker` is
// built on. It is a stateless utility: every function takes a vertex ring and returns
// a fresh result, so no scratch buffers outlive a call and independent trackers can
// run on independent tasks.
//
// Key architectural principles:
// 1.  **Open, Counter-Clockwise Rings**: A hull is a `Vec<Point2>` in CCW order whose
//     first vertex is NOT repeated at the end. Degenerate hulls are legal: a single
//     vertex (one distinct point) and a two-vertex segment (collinear input).
// 2.  **Monotone Chain**: Hulls are built with Andrew's monotone chain. Collinear
//     points, and points within `EPSILON` of collinear, are dropped, so every vertex
//     of the ring is a true corner and agrees with what `covered_by` accepts.
// 3.  **Closed Containment**: `covered_by` treats the boundary as part of the hull.
//     A point on an edge or vertex is "covered" and never grows the hull.

use crate::core_modules::point::Point2;
use std::cmp::Ordering;

/// Tolerance for orientation and on-boundary tests.
pub const EPSILON: f64 = 1e-10;

/// Twice the signed area of the triangle (o, a, b). Positive when o→a→b turns left.
pub fn cross(o: &Point2, a: &Point2, b: &Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull of an arbitrary vertex set as an open CCW ring.
pub fn convex_hull(points: &[Point2]) -> Vec<Point2> {
    let mut sorted: Vec<Point2> = points.to_vec();
    sorted.sort_by(|p, q| match p.x.total_cmp(&q.x) {
        Ordering::Equal => p.y.total_cmp(&q.y),
        other => other,
    });
    sorted.dedup_by(|p, q| p.distance(q) <= EPSILON);

    if sorted.len() <= 2 {
        return sorted;
    }

    let mut lower: Vec<Point2> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while let [.., a, b] = lower.as_slice() {
            if cross(a, b, p) <= EPSILON {
                lower.pop();
            } else {
                break;
            }
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while let [.., a, b] = upper.as_slice() {
            if cross(a, b, p) <= EPSILON {
                upper.pop();
            } else {
                break;
            }
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// The hull of `hull ∪ {p}`. Only the current ring is considered: a point interior to
/// a hull stays interior to every larger hull, so it can never come back as a vertex.
pub fn extend(hull: &[Point2], p: Point2) -> Vec<Point2> {
    let mut candidates = Vec::with_capacity(hull.len() + 1);
    candidates.extend_from_slice(hull);
    candidates.push(p);
    convex_hull(&candidates)
}

/// Area enclosed by a ring (shoelace). Degenerate rings have zero area.
pub fn polygon_area(ring: &[Point2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let twice: f64 = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    (twice / 2.0).abs()
}

/// Whether `p` lies inside the ring or on its boundary.
pub fn covered_by(ring: &[Point2], p: &Point2) -> bool {
    match ring {
        [] => false,
        [only] => only.distance(p) <= EPSILON,
        [a, b] => on_segment(a, b, p),
        _ => ring
            .iter()
            .zip(ring.iter().cycle().skip(1))
            .all(|(a, b)| cross(a, b, p) >= -EPSILON),
    }
}

fn on_segment(a: &Point2, b: &Point2, p: &Point2) -> bool {
    if cross(a, b, p).abs() > EPSILON {
        return false;
    }
    let dot = (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
    let len_sq = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    dot >= -EPSILON && dot <= len_sq + EPSILON
}
