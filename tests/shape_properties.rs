//! Property and scenario tests for the shape tracker and scoring engine.
//!
//! Tests cover:
//! - Hull containment and area monotonicity under arbitrary insertion sequences
//! - Idempotent re-insertion of covered points
//! - Incremental hull agreement with a full rebuild
//! - Score boundaries for tiny crowns

use approx::assert_relative_eq;
use crown_shape::core_modules::hull::covered_by;
use crown_shape::{Point, ShapeTracker};
use proptest::prelude::*;
use std::f64::consts::PI;

fn grow(coords: &[(f64, f64, f64)]) -> ShapeTracker {
    let mut tracker = ShapeTracker::new();
    for (i, &(x, y, z)) in coords.iter().enumerate() {
        tracker.add_point(Point::new(x, y, z, i));
    }
    tracker
}

fn coords() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-50.0..50.0f64, -50.0..50.0f64, 0.0..40.0f64), 1..60)
}

proptest! {
    #[test]
    fn every_point_stays_covered(coords in coords()) {
        let tracker = grow(&coords);
        prop_assert_eq!(tracker.count(), tracker.points().len());
        for p in tracker.points() {
            prop_assert!(covered_by(tracker.hull(), &p.planar()));
        }
    }

    #[test]
    fn area_never_shrinks(coords in coords()) {
        let mut tracker = ShapeTracker::new();
        let mut previous = 0.0;
        for (i, &(x, y, z)) in coords.iter().enumerate() {
            tracker.add_point(Point::new(x, y, z, i));
            prop_assert!(tracker.area() >= previous - 1e-9);
            prop_assert!(tracker.area_delta() >= 0.0);
            previous = tracker.area();
        }
    }

    #[test]
    fn reinserting_members_changes_nothing_but_count(coords in coords()) {
        let mut tracker = grow(&coords);
        let hull = tracker.hull().to_vec();
        let area = tracker.area();
        let delta = tracker.area_delta();
        let members = tracker.points().to_vec();
        for p in members {
            tracker.add_point(p);
        }
        prop_assert_eq!(tracker.count(), coords.len() * 2);
        prop_assert_eq!(tracker.hull(), hull.as_slice());
        prop_assert_eq!(tracker.area(), area);
        prop_assert_eq!(tracker.area_delta(), delta);
    }

    #[test]
    fn incremental_hull_matches_rebuild(coords in coords()) {
        let mut tracker = grow(&coords);
        let incremental = tracker.area();
        tracker.rebuild();
        prop_assert!((tracker.area() - incremental).abs() < 1e-6);
    }

    #[test]
    fn test_area_predicts_add_point(coords in coords(), x in -80.0..80.0f64, y in -80.0..80.0f64) {
        let mut tracker = grow(&coords);
        prop_assume!(tracker.count() >= 3);
        let candidate = Point::new(x, y, 1.0, coords.len());
        let predicted = tracker.test_area(&candidate);
        let before = tracker.area();
        tracker.add_point(candidate);
        prop_assert!(((tracker.area() - before).abs() - predicted).abs() < 1e-6);
    }
}

#[test]
fn tiny_crowns_score_zero_on_shape() {
    for n in 1..=2 {
        let mut tracker = grow(&[(0.0, 0.0, 12.0), (2.0, 1.0, 9.0)][..n]);
        for k in [1, 3, 8] {
            let scores = tracker.score(k);
            assert_eq!(scores.orientation, 0.0);
            assert_eq!(scores.circularity, 0.0);
            assert_eq!(scores.regularity, 0.0);
        }
    }
}

#[test]
fn sampled_circle_is_nearly_circular() {
    let mut crown = vec![(0.0, 0.0, 12.0)];
    crown.extend((0..24).map(|i| {
        let a = 2.0 * PI * i as f64 / 24.0 + 0.1;
        (4.0 * a.cos(), 4.0 * a.sin(), 8.0)
    }));
    let mut tracker = grow(&crown);
    let scores = tracker.score(4);
    assert_relative_eq!(scores.circularity, 1.0, epsilon = 0.05);
    assert!(scores.regularity > 0.9);
}

#[test]
fn distance_query_uses_the_nearest_of_three() {
    let tracker = grow(&[(0.0, 0.0, 10.0), (6.0, 0.0, 10.0), (0.0, 8.0, 10.0)]);
    let d = tracker.test_distance(&Point::new(5.0, 0.0, 0.0, 3)).unwrap();
    assert_relative_eq!(d, 1.0);
}
