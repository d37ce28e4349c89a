// THEORY:
// The `ellipse` module fits the enclosing principal-axis ellipse used by the
// circularity heuristic. The fit is a PCA box: the hull vertices are centred, their
// 2x2 covariance gives the principal directions, and the half-extents of the vertices
// projected onto those directions are taken as the two semi-axes.

use crate::core_modules::hull::EPSILON;
use crate::core_modules::point::Point2;

/// Semi-axes of a fitted ellipse along its two principal directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseAxes {
    pub center: Point2,
    /// Angle of the first principal direction, radians from the x axis.
    pub angle: f64,
    pub semi_axis_1: f64,
    pub semi_axis_2: f64,
}

impl EllipseAxes {
    pub fn major(&self) -> f64 {
        self.semi_axis_1.max(self.semi_axis_2)
    }

    pub fn minor(&self) -> f64 {
        self.semi_axis_1.min(self.semi_axis_2)
    }
}

/// Fits the principal-axis ellipse of a vertex set. `None` for an empty input.
pub fn fit_principal_axes(vertices: &[Point2]) -> Option<EllipseAxes> {
    let mut unique: Vec<Point2> = Vec::with_capacity(vertices.len());
    for v in vertices {
        if !unique.iter().any(|u| u.distance(v) <= EPSILON) {
            unique.push(*v);
        }
    }
    if unique.is_empty() {
        return None;
    }

    let n = unique.len() as f64;
    let cx = unique.iter().map(|v| v.x).sum::<f64>() / n;
    let cy = unique.iter().map(|v| v.y).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for v in &unique {
        let dx = v.x - cx;
        let dy = v.y - cy;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    sxx /= n;
    syy /= n;
    sxy /= n;

    // Eigenvectors of a symmetric 2x2 matrix are a rotation by this angle.
    let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let (sin, cos) = angle.sin_cos();

    let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in &unique {
        let dx = p.x - cx;
        let dy = p.y - cy;
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        min_u = min_u.min(u);
        max_u = max_u.max(u);
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }

    Some(EllipseAxes {
        center: Point2::new(cx, cy),
        angle,
        semi_axis_1: (max_u - min_u).abs() / 2.0,
        semi_axis_2: (max_v - min_v).abs() / 2.0,
    })
}
