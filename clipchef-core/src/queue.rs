//! Bounded ingest queue with a concurrency-limited worker pool.
//!
//! Submitters enqueue and return immediately. A dispatcher task pulls tasks
//! off the channel and runs each on its own task once a semaphore permit is
//! free, so at most `concurrency` ingestions run at once and at most
//! `capacity` wait in the channel.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{self, ConfigError};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_CAPACITY: usize = 256;

/// One detached ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestTask {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub url: String,
}

/// Does the work for one task. Errors are the handler's to record; the queue
/// only schedules.
#[async_trait]
pub trait IngestHandler: Send + Sync + 'static {
    async fn handle(&self, task: IngestTask);
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("Ingest queue is full")]
    Full,

    #[error("Ingest queue is shut down")]
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub concurrency: usize,
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl QueueConfig {
    /// Optional: `CLIPCHEF_INGEST_CONCURRENCY` (default 4),
    /// `CLIPCHEF_INGEST_QUEUE_SIZE` (default 256). Zero is raised to one.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            concurrency: config::parse_or("CLIPCHEF_INGEST_CONCURRENCY", DEFAULT_CONCURRENCY)?
                .max(1),
            capacity: config::parse_or("CLIPCHEF_INGEST_QUEUE_SIZE", DEFAULT_CAPACITY)?.max(1),
        })
    }
}

/// Handle for submitting tasks. Cloning shares the same queue.
#[derive(Clone)]
pub struct IngestQueue {
    sender: mpsc::Sender<IngestTask>,
}

impl IngestQueue {
    /// Start the dispatcher. It runs until every `IngestQueue` clone is dropped
    /// and the channel drains.
    pub fn start(handler: Arc<dyn IngestHandler>, config: QueueConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let dispatcher = tokio::spawn(dispatch(receiver, handler, config.concurrency.max(1)));
        (Self { sender }, dispatcher)
    }

    /// Enqueue without waiting.
    pub fn submit(&self, task: IngestTask) -> Result<(), QueueError> {
        self.sender.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(task) => {
                tracing::warn!(job_id = %task.job_id, "ingest queue full");
                QueueError::Full
            }
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

async fn dispatch(
    mut receiver: mpsc::Receiver<IngestTask>,
    handler: Arc<dyn IngestHandler>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency));

    while let Some(task) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let handler = handler.clone();
        tokio::spawn(async move {
            tracing::debug!(job_id = %task.job_id, "ingest task started");
            handler.handle(task).await;
            drop(permit);
        });
    }

    tracing::info!("ingest dispatcher stopped");
}
