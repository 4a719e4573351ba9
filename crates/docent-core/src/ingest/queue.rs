//! Ingestion task queue and worker pool
//!
//! Submissions go onto a bounded channel consumed by a fixed pool of
//! workers, each running the full pipeline per document. Callers get a
//! handle they can await for the outcome without holding up the queue.

use super::IngestionPipeline;
use crate::db::DocumentIntake;
use crate::error::{DocentError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const QUEUE_CAPACITY: usize = 64;

struct IngestTask {
    intake: DocumentIntake,
    reply: oneshot::Sender<Result<i64>>,
}

/// Awaitable outcome of a submitted ingestion
pub struct IngestHandle {
    rx: oneshot::Receiver<Result<i64>>,
}

impl IngestHandle {
    /// Wait for the document to finish ingesting; resolves to its id
    pub async fn wait(self) -> Result<i64> {
        self.rx
            .await
            .map_err(|_| DocentError::Index("ingestion worker dropped the task".into()))?
    }
}

/// Worker pool over the ingestion pipeline
pub struct IngestQueue {
    tx: mpsc::Sender<IngestTask>,
    workers: Vec<JoinHandle<()>>,
}

impl IngestQueue {
    /// Spawn `workers` consumers over a shared queue
    pub fn start(pipeline: Arc<IngestionPipeline>, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<IngestTask>(QUEUE_CAPACITY);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let rx = rx.clone();
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    loop {
                        let task = {
                            let mut rx = rx.lock().await;
                            rx.recv().await
                        };
                        let Some(task) = task else {
                            debug!(worker_id, "ingest worker shutting down");
                            break;
                        };
                        let result = pipeline.ingest(task.intake).await;
                        // Caller may have stopped waiting; that's fine
                        let _ = task.reply.send(result);
                    }
                })
            })
            .collect();

        info!(workers = workers.max(1), "ingestion workers started");
        Self {
            tx,
            workers: handles,
        }
    }

    /// Enqueue a document for ingestion
    pub async fn submit(&self, intake: DocumentIntake) -> Result<IngestHandle> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(IngestTask { intake, reply })
            .await
            .map_err(|_| DocentError::Index("ingestion queue is shut down".into()))?;
        Ok(IngestHandle { rx })
    }

    /// Stop accepting work and wait for in-flight ingestions to finish
    pub async fn shutdown(self) {
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.await;
        }
        info!("ingestion queue drained");
    }
}
