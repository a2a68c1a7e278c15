//! Job event broadcaster for live job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::{Job, JobKind, JobStatus};

/// A change to one job, published after the store applied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub processed_items: usize,
    pub total_items: usize,
    pub progress_percentage: f64,
    /// Human-readable description of the change.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn from_job(job: &Job) -> Self {
        let message = match job.status {
            JobStatus::Queued => "Job queued".to_string(),
            JobStatus::Processing => format!(
                "{}/{} items processed",
                job.processed_items, job.total_items
            ),
            JobStatus::Completed => format!(
                "Completed: {} succeeded, {} failed",
                job.successful_items, job.failed_items
            ),
            JobStatus::Failed => job
                .errors
                .last()
                .cloned()
                .unwrap_or_else(|| "Job failed".to_string()),
            JobStatus::Cancelled => "Job cancelled".to_string(),
        };

        Self {
            job_id: job.id.clone(),
            kind: job.kind,
            status: job.status,
            processed_items: job.processed_items,
            total_items: job.total_items,
            progress_percentage: job.progress_percentage,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts job events to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
