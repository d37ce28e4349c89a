// THEORY:
// The outlier filter trims a local neighbourhood before it is used to seed or grow a
// crown. The neighbourhood arrives as the output of a nearest-neighbour query: element
// 0 is the reference point, the rest are its neighbours sorted by distance.
//
// The cut-off is statistical (mean + 2 population std of the planar distances to the
// reference) and it is applied as a prefix scan: the walk stops at the first neighbour
// beyond the cut-off, and everything after it is dropped even if it would pass on its
// own. The scan relies on the caller's distance ordering.

use crate::core_modules::point::Point;

/// Number of standard deviations above the mean a neighbour may lie.
const STD_DEV_FACTOR: f64 = 2.0;

/// `mean + 2 · std` of a distance sample (population standard deviation).
/// Zero for an empty sample.
pub fn distance_threshold(distances: &[f64]) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }
    let n = distances.len() as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    mean + STD_DEV_FACTOR * variance.sqrt()
}

/// Keeps the reference point and the longest prefix of neighbours whose planar
/// distance to it is within the threshold (inclusive).
pub fn filter_neighborhood(neighborhood: &[Point]) -> Vec<Point> {
    let Some((reference, neighbors)) = neighborhood.split_first() else {
        return Vec::new();
    };

    let distances: Vec<f64> = neighbors
        .iter()
        .map(|n| reference.planar_distance(n))
        .collect();
    let threshold = distance_threshold(&distances);

    let mut kept = Vec::with_capacity(neighborhood.len());
    kept.push(*reference);
    kept.extend(
        neighbors
            .iter()
            .zip(&distances)
            .take_while(|(_, d)| **d <= threshold)
            .map(|(p, _)| *p),
    );
    kept
}
