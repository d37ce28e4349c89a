//! Scores candidate tree crowns from a labelled point CSV.
//!
//! Usage:
//!   crown_shape points.csv --output crowns.csv
//!   crown_shape points.csv --k 6 --min-score 0.6 --filter-outliers --labels labels.csv
//!
//! Input columns: id, x, y, z, cluster. Points of a cluster are tracked in file order.

use anyhow::{Context, Result};
use clap::Parser;
use crown_shape::pipeline::assign_labels;
use crown_shape::{Cluster, CrownReport, ParallelPipeline, PipelineConfig, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crown_shape", version, about = "Score LiDAR tree-crown candidates by shape")]
struct Args {
    /// CSV with columns id, x, y, z, cluster.
    input: PathBuf,

    /// Report CSV, one row per cluster.
    #[arg(short, long, default_value = "crowns.csv")]
    output: PathBuf,

    /// JSON configuration file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Neighbourhood size for the size score.
    #[arg(long)]
    k: Option<u32>,

    /// Minimum points for a crown to be scored.
    #[arg(long)]
    min_points: Option<usize>,

    /// Minimum global score for a crown to be accepted.
    #[arg(long)]
    min_score: Option<f64>,

    /// Filter each cluster's outliers before tracking it.
    #[arg(long)]
    filter_outliers: bool,

    /// Worker pool size (default: one per CPU).
    #[arg(long)]
    workers: Option<usize>,

    /// Also write per-point crown labels (id, crown) to this CSV.
    #[arg(long)]
    labels: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PointRow {
    id: usize,
    x: f64,
    y: f64,
    z: f64,
    cluster: u64,
}

#[derive(Debug, Serialize)]
struct ReportRow {
    cluster: u64,
    points: usize,
    area: f64,
    apex_x: Option<f64>,
    apex_y: Option<f64>,
    top_z: Option<f64>,
    size: f64,
    orientation: f64,
    circularity: f64,
    regularity: f64,
    global: f64,
    accepted: bool,
}

impl From<&CrownReport> for ReportRow {
    fn from(r: &CrownReport) -> Self {
        Self {
            cluster: r.cluster_id,
            points: r.point_count,
            area: r.area,
            apex_x: r.apex.map(|a| a.x),
            apex_y: r.apex.map(|a| a.y),
            top_z: r.highest.map(|h| h.z),
            size: r.scores.size,
            orientation: r.scores.orientation,
            circularity: r.scores.circularity,
            regularity: r.scores.regularity,
            global: r.scores.global,
            accepted: r.accepted,
        }
    }
}

#[derive(Debug, Serialize)]
struct LabelRow {
    id: usize,
    crown: u32,
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(k) = args.k {
        config.k_neighbors = k;
    }
    if let Some(n) = args.min_points {
        config.min_points = n;
    }
    if let Some(s) = args.min_score {
        config.min_global_score = s;
    }
    if args.filter_outliers {
        config.filter_outliers = true;
    }
    if args.workers.is_some() {
        config.worker_count = args.workers;
    }
    config.validate()?;
    Ok(config)
}

/// Groups points by cluster, keeping clusters in order of first appearance.
///
/// Points are identified by their row number; the returned vector maps each row
/// back to the `id` column of the file.
fn load_clusters(path: &Path) -> Result<(Vec<Cluster>, Vec<usize>)> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut source_ids: Vec<usize> = Vec::new();

    for row in reader.deserialize() {
        let row: PointRow = row.with_context(|| format!("parsing {}", path.display()))?;
        let slot = *index.entry(row.cluster).or_insert_with(|| {
            clusters.push(Cluster { id: row.cluster, points: Vec::new() });
            clusters.len() - 1
        });
        clusters[slot].points.push(Point::new(row.x, row.y, row.z, source_ids.len()));
        source_ids.push(row.id);
    }

    Ok((clusters, source_ids))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let (clusters, source_ids) = load_clusters(&args.input)?;
    info!(clusters = clusters.len(), points = source_ids.len(), "input loaded");

    let pipeline = ParallelPipeline::new(config)?;
    let evaluated = pipeline.evaluate_clusters(clusters).await?;
    pipeline.shutdown().await;
    let reports: Vec<&CrownReport> = evaluated.iter().map(|(report, _)| report).collect();

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for report in &reports {
        writer.serialize(ReportRow::from(*report))?;
    }
    writer.flush()?;
    info!(path = %args.output.display(), rows = reports.len(), "report written");

    if let Some(path) = &args.labels {
        let labels = assign_labels(&evaluated, source_ids.len());
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        for (&id, crown) in source_ids.iter().zip(labels) {
            writer.serialize(LabelRow { id, crown })?;
        }
        writer.flush()?;
        info!(path = %path.display(), "labels written");
    }

    Ok(())
}
