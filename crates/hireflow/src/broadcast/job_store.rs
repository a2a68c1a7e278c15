//! In-memory job registry shared by orchestrators, pollers and cancellers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::broadcast::job_events::{JobEvent, JobEventBroadcaster};
use crate::job::{Job, JobIdGenerator, JobKind, JobStatus, MintedId};

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Thread-safe `job id → Job` map.
///
/// Each job has a single writer (its orchestrator) apart from the narrow
/// cancel path, so the one map-level lock is enough.
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
    ids: JobIdGenerator,
    events: Option<JobEventBroadcaster>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            ids: JobIdGenerator::new(),
            events: None,
        }
    }

    /// Creates a store that publishes every change on `events`.
    pub fn with_events(events: JobEventBroadcaster) -> Self {
        Self {
            events: Some(events),
            ..Self::new()
        }
    }

    pub fn events(&self) -> Option<&JobEventBroadcaster> {
        self.events.as_ref()
    }

    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Mints a unique job id.
    pub fn next_id(&self, kind: JobKind, now: DateTime<Utc>) -> MintedId {
        self.ids.next(kind, now)
    }

    /// Inserts a new job, replacing nothing: an id already present is left alone.
    pub fn insert(&self, job: Job) -> bool {
        let job_id = job.id.clone();
        let event = {
            let mut jobs = self.write_jobs();
            if jobs.contains_key(&job_id) {
                None
            } else {
                let event = self.events.as_ref().map(|_| JobEvent::from_job(&job));
                jobs.insert(job_id.clone(), job);
                Some(event)
            }
        };
        match event {
            Some(event) => {
                if let (Some(events), Some(event)) = (&self.events, event) {
                    events.send(event);
                }
                true
            }
            None => {
                log::error!("Refusing to overwrite existing job {}", job_id);
                false
            }
        }
    }

    /// Returns a snapshot of one job.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.read_jobs().get(job_id).cloned()
    }

    /// Returns all jobs, newest first.
    pub fn get_all(&self) -> Vec<Job> {
        let mut result: Vec<Job> = self.read_jobs().values().cloned().collect();
        result.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        result
    }

    /// Returns jobs that are queued or processing.
    pub fn get_active(&self) -> Vec<Job> {
        self.read_jobs()
            .values()
            .filter(|j| j.status.is_active())
            .cloned()
            .collect()
    }

    /// Applies `f` to the job under the write lock and publishes the result.
    pub fn update<F, T>(&self, job_id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut Job) -> T,
    {
        let (value, event) = {
            let mut jobs = self.write_jobs();
            let job = jobs.get_mut(job_id)?;
            let value = f(job);
            // Events carry counters only; the job itself is never cloned here
            let event = self.events.as_ref().map(|_| JobEvent::from_job(job));
            (value, event)
        };
        if let (Some(events), Some(event)) = (&self.events, event) {
            events.send(event);
        }
        Some(value)
    }

    /// Marks a queued or processing job cancelled.
    pub fn cancel(&self, job_id: &str) -> bool {
        let cancelled = self
            .update(job_id, |job| job.cancel(Utc::now()))
            .unwrap_or(false);
        if cancelled {
            log::info!("Cancelled job {}", job_id);
        }
        cancelled
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.read_jobs().get(job_id).map(|j| j.status)
    }

    pub fn is_cancelled(&self, job_id: &str) -> bool {
        self.status(job_id) == Some(JobStatus::Cancelled)
    }

    /// Returns the count of jobs by status.
    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for job in self.read_jobs().values() {
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    /// Drops finished jobs whose `completed_at` is older than `max_age`.
    pub fn cleanup_finished(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            return 0;
        };
        let removed = {
            let mut jobs = self.write_jobs();
            let before = jobs.len();
            jobs.retain(|_, job| {
                !(job.is_finished() && job.completed_at.map(|t| t < cutoff).unwrap_or(false))
            });
            before - jobs.len()
        };
        if removed > 0 {
            log::info!("Cleaned up {} old jobs", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
