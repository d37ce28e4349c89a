// THEORY:
// This file is the main entry point for the `crown_shape` library crate.
//
// The crate answers one question for a LiDAR tree-segmentation loop: "how much does
// this growing cluster of points look like a tree crown?" The `ShapeTracker` follows
// a single cluster as points are added and keeps its convex hull and descriptors
// current; the scoring engine turns that state into four shape heuristics and a
// global score. The `pipeline` and `parallel_pipeline` modules score whole scenes of
// independent clusters, sequentially or on a tokio worker pool.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::outlier_filter::filter_neighborhood;
pub use core_modules::point::{Point, Point2};
pub use core_modules::scoring::ShapeScores;
pub use core_modules::shape_tracker::ShapeTracker;
pub use error::{CrownError, Result};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{Cluster, CrownPipeline, CrownReport, PipelineConfig};
