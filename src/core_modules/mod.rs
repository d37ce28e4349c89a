pub mod ellipse;
pub mod hull;
pub mod outlier_filter;
pub mod point;
pub mod scoring;
pub mod shape_tracker;
