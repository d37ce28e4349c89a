// THEORY:
// Crowns share no state, so scoring a whole scene is embarrassingly parallel. The
// `ParallelPipeline` spreads clusters over a pool of tokio workers: a dispatcher task
// receives every cluster and hands them out round-robin, each worker grows and scores
// its own `ShapeTracker`, and the result travels back on a per-cluster oneshot
// channel. Reports are collected in submission order, so the output matches the
// sequential `CrownPipeline` exactly.
//
// The pool must be created from inside a tokio runtime.

use crate::core_modules::shape_tracker::ShapeTracker;
use crate::error::{CrownError, Result};
use crate::pipeline::{evaluate_cluster, Cluster, CrownReport, PipelineConfig};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// A scored crown together with the tracker that produced it.
pub type Evaluated = (CrownReport, ShapeTracker);

pub struct ClusterTask {
    pub cluster: Cluster,
    pub result_sender: oneshot::Sender<Result<Evaluated>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<ClusterTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: PipelineConfig) -> Self {
        let worker_count = config.workers().max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ClusterTask>();
        let mut workers = Vec::with_capacity(worker_count);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<ClusterTask>())
            .unzip();

        // Dispatcher
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    warn!(worker = worker_idx, "worker channel closed");
                }
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let worker_config = config.clone();
            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    debug!(worker = worker_id, cluster = task.cluster.id, "scoring cluster");
                    let result = evaluate_cluster(&task.cluster, &worker_config);
                    let _ = task.result_sender.send(result);
                }
            });
            workers.push(worker);
        }

        Self { task_sender, workers }
    }

    pub fn submit(&self, cluster: Cluster) -> Result<oneshot::Receiver<Result<Evaluated>>> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(ClusterTask { cluster, result_sender })
            .map_err(|_| CrownError::WorkerSend)?;
        Ok(result_receiver)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Closes the task queue and waits for every worker to drain it.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Scores clusters on a worker pool.
pub struct ParallelPipeline {
    config: PipelineConfig,
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let worker_pool = WorkerPool::new(config.clone());
        info!(workers = worker_pool.size(), "worker pool started");
        Ok(Self { config, worker_pool })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reports and trackers for every non-empty cluster, in input order. Empty
    /// clusters are skipped, as in the sequential pipeline.
    pub async fn evaluate_clusters(&self, clusters: Vec<Cluster>) -> Result<Vec<Evaluated>> {
        let total = clusters.len();
        let receivers = clusters
            .into_iter()
            .map(|cluster| self.worker_pool.submit(cluster))
            .collect::<Result<Vec<_>>>()?;

        let mut evaluated = Vec::with_capacity(total);
        for outcome in join_all(receivers).await {
            match outcome.map_err(|_| CrownError::WorkerReceive)? {
                Ok(crown) => evaluated.push(crown),
                Err(CrownError::EmptyCluster(id)) => warn!(cluster = id, "skipping empty cluster"),
                Err(e) => return Err(e),
            }
        }

        info!(
            clusters = total,
            accepted = evaluated.iter().filter(|(r, _)| r.accepted).count(),
            "crowns scored"
        );
        Ok(evaluated)
    }

    /// Scores every non-empty cluster, reported in input order.
    pub async fn score_clusters(&self, clusters: Vec<Cluster>) -> Result<Vec<CrownReport>> {
        let evaluated = self.evaluate_clusters(clusters).await?;
        Ok(evaluated.into_iter().map(|(report, _)| report).collect())
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::point::Point;
    use crate::pipeline::{assign_labels, CrownPipeline};

    fn scene() -> Vec<Cluster> {
        (0..20u64)
            .map(|c| {
                let cx = c as f64 * 15.0;
                let mut points = vec![Point::new(cx, 0.0, 10.0 + c as f64, 0)];
                for i in 0..(3 + c as usize) {
                    let a = i as f64 * 2.3;
                    let r = 1.0 + (i % 3) as f64;
                    points.push(Point::new(cx + r * a.cos(), r * a.sin(), 5.0, i + 1));
                }
                Cluster { id: c, points }
            })
            .collect()
    }

    #[tokio::test]
    async fn parallel_matches_sequential() {
        let config = PipelineConfig { worker_count: Some(3), ..Default::default() };
        let sequential = CrownPipeline::new(config.clone()).unwrap().score_clusters(&scene());

        let pipeline = ParallelPipeline::new(config).unwrap();
        let parallel = pipeline.score_clusters(scene()).await.unwrap();
        pipeline.shutdown().await;

        assert_eq!(parallel, sequential);
    }

    #[tokio::test]
    async fn labels_from_pool_match_sequential_labels() {
        let config = PipelineConfig { worker_count: Some(4), ..Default::default() };
        let total = scene().iter().map(|c| c.points.len()).max().unwrap_or(0);
        let sequential = CrownPipeline::new(config.clone()).unwrap().label_points(&scene(), total);

        let pipeline = ParallelPipeline::new(config).unwrap();
        let evaluated = pipeline.evaluate_clusters(scene()).await.unwrap();
        pipeline.shutdown().await;

        assert_eq!(assign_labels(&evaluated, total), sequential);
    }

    #[tokio::test]
    async fn empty_clusters_are_skipped() {
        let pipeline = ParallelPipeline::new(PipelineConfig {
            worker_count: Some(2),
            ..Default::default()
        })
        .unwrap();
        let mut clusters = scene();
        clusters.insert(3, Cluster { id: 99, points: vec![] });
        let reports = pipeline.score_clusters(clusters).await.unwrap();
        assert_eq!(reports.len(), 20);
        assert!(reports.iter().all(|r| r.cluster_id != 99));
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let config = PipelineConfig { worker_count: Some(0), ..Default::default() };
        assert!(ParallelPipeline::new(config).is_err());
    }
}
