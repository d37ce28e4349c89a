// THEORY:
// The `pipeline` module is the top-level API for scoring whole crowns. It wraps the
// shape tracker, the outlier filter and the scoring engine into a single
// configuration-driven entry point: hand it clusters of points (as produced by some
// external segmentation), get back one report per crown.
//
// The segmentation policy itself is not decided here. The pipeline only grows a
// tracker over each cluster in the order its points are given, scores it, and marks
// it accepted when its global score clears the configured floor.

use crate::core_modules::outlier_filter::filter_neighborhood;
use crate::core_modules::point::{Point, Point2};
use crate::core_modules::scoring::ShapeScores;
use crate::core_modules::shape_tracker::ShapeTracker;
use crate::error::{CrownError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Configuration for the crown pipelines, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Neighbourhood size used by the size score.
    pub k_neighbors: u32,
    /// Crowns with fewer points are reported unscored and rejected.
    pub min_points: usize,
    /// Global score a crown needs to be accepted.
    pub min_global_score: f64,
    /// Run each cluster through the outlier filter before tracking it, using the
    /// cluster's first point as reference.
    pub filter_outliers: bool,
    /// Size of the parallel worker pool. `None` means one worker per CPU.
    pub worker_count: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 4,
            min_points: 3,
            min_global_score: 0.5,
            filter_outliers: false,
            worker_count: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_neighbors == 0 {
            return Err(CrownError::InvalidConfig("k_neighbors must be at least 1".into()));
        }
        if self.worker_count == Some(0) {
            return Err(CrownError::InvalidConfig("worker_count must be at least 1".into()));
        }
        Ok(())
    }

    pub fn workers(&self) -> usize {
        self.worker_count.unwrap_or_else(num_cpus::get)
    }
}

/// A candidate crown as handed over by the segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: u64,
    /// Points in growth order; the first one is the apex.
    pub points: Vec<Point>,
}

/// The outcome of scoring one crown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrownReport {
    pub cluster_id: u64,
    /// Points that made it into the tracker (after outlier filtering).
    pub point_count: usize,
    pub area: f64,
    pub apex: Option<Point2>,
    /// Highest point of the crown.
    pub highest: Option<Point>,
    pub scores: ShapeScores,
    pub accepted: bool,
}

/// Runs the outlier filter over a cluster with its neighbours ordered by planar
/// distance from the first point, then puts the survivors back in growth order.
fn drop_outliers(points: &[Point]) -> Vec<Point> {
    let Some(reference) = points.first() else {
        return Vec::new();
    };
    let mut by_distance: Vec<usize> = (1..points.len()).collect();
    by_distance.sort_by(|&a, &b| {
        reference
            .planar_distance(&points[a])
            .total_cmp(&reference.planar_distance(&points[b]))
    });

    let neighborhood: Vec<Point> = std::iter::once(*reference)
        .chain(by_distance.iter().map(|&i| points[i]))
        .collect();
    let kept = filter_neighborhood(&neighborhood).len();

    let mut survivors = by_distance[..kept - 1].to_vec();
    survivors.sort_unstable();
    std::iter::once(*reference)
        .chain(survivors.into_iter().map(|i| points[i]))
        .collect()
}

/// Per-point crown labels for a cloud of `total_points` points, from already
/// evaluated crowns.
///
/// Accepted crowns are numbered from 1 in the given order; 0 means unassigned.
/// A point claimed by an earlier crown keeps its label.
pub fn assign_labels(evaluated: &[(CrownReport, ShapeTracker)], total_points: usize) -> Vec<u32> {
    let mut labels = vec![0u32; total_points];
    let mut crown_index = 1u32;
    for (report, tracker) in evaluated {
        if report.accepted {
            tracker.label_points(&mut labels, crown_index);
            crown_index += 1;
        }
    }
    labels
}

/// Grows a tracker over the cluster and scores it.
pub(crate) fn evaluate_cluster(
    cluster: &Cluster,
    config: &PipelineConfig,
) -> Result<(CrownReport, ShapeTracker)> {
    if cluster.points.is_empty() {
        return Err(CrownError::EmptyCluster(cluster.id));
    }

    let points = if config.filter_outliers {
        drop_outliers(&cluster.points)
    } else {
        cluster.points.clone()
    };

    let mut iter = points.into_iter();
    let mut tracker = match iter.next() {
        Some(first) => ShapeTracker::seeded(first),
        None => return Err(CrownError::EmptyCluster(cluster.id)),
    };
    for pt in iter {
        tracker.add_point(pt);
    }

    let (scores, accepted) = if tracker.count() < config.min_points {
        (ShapeScores::default(), false)
    } else {
        let scores = tracker.score(config.k_neighbors);
        (scores, scores.global >= config.min_global_score)
    };

    let report = CrownReport {
        cluster_id: cluster.id,
        point_count: tracker.count(),
        area: tracker.area(),
        apex: tracker.apex(),
        highest: tracker.highest_point().copied(),
        scores,
        accepted,
    };
    Ok((report, tracker))
}

/// Sequential crown pipeline.
pub struct CrownPipeline {
    config: PipelineConfig,
}

impl CrownPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn score_cluster(&self, cluster: &Cluster) -> Result<CrownReport> {
        evaluate_cluster(cluster, &self.config).map(|(report, _)| report)
    }

    /// Scores every non-empty cluster, in input order. Empty clusters are skipped.
    pub fn score_clusters(&self, clusters: &[Cluster]) -> Vec<CrownReport> {
        let reports: Vec<CrownReport> = clusters
            .iter()
            .filter_map(|cluster| match self.score_cluster(cluster) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(cluster = cluster.id, error = %e, "skipping cluster");
                    None
                }
            })
            .collect();
        info!(
            clusters = clusters.len(),
            accepted = reports.iter().filter(|r| r.accepted).count(),
            "crowns scored"
        );
        reports
    }

    /// Reports and trackers for every non-empty cluster, in input order.
    pub fn evaluate_clusters(&self, clusters: &[Cluster]) -> Vec<(CrownReport, ShapeTracker)> {
        clusters
            .iter()
            .filter_map(|cluster| evaluate_cluster(cluster, &self.config).ok())
            .collect()
    }

    /// Per-point crown labels for a cloud of `total_points` points. See [`assign_labels`].
    pub fn label_points(&self, clusters: &[Cluster], total_points: usize) -> Vec<u32> {
        assign_labels(&self.evaluate_clusters(clusters), total_points)
    }
}
