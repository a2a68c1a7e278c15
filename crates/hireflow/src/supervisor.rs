//! Facade for starting, observing and cancelling batch jobs.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::broadcast::JobStore;
use crate::collaborators::ExecutionContext;
use crate::config::{Config, RetentionConfig};
use crate::error::SupervisorError;
use crate::job::{Job, JobKind, JobMetadata};
use crate::orchestrator::JobOrchestrator;
use crate::processors::UploadedFile;
use crate::worker::pool::panic_message;

/// A request to start a job.
#[derive(Debug, Clone)]
pub enum JobRequest {
    BatchParse {
        files: Vec<UploadedFile>,
    },
    BulkRegenerate {
        prompt_template_id: Option<i64>,
        /// Operator attribution; `system` when absent.
        created_by: Option<String>,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::BatchParse { .. } => JobKind::BatchParse,
            JobRequest::BulkRegenerate { .. } => JobKind::BulkRegenerate,
        }
    }
}

struct RunningJob {
    handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
}

struct Sweeper {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Entry point for callers. Every job runs on its own thread; callers poll
/// the store through this facade.
pub struct JobSupervisor {
    store: Arc<JobStore>,
    orchestrator: Arc<JobOrchestrator>,
    retention: RetentionConfig,
    running: Mutex<HashMap<String, RunningJob>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl JobSupervisor {
    pub fn new(config: &Config, context: Option<ExecutionContext>, store: Arc<JobStore>) -> Self {
        if context.is_none() {
            warn!("Job supervisor created without collaborators; jobs will fail at setup");
        }
        let orchestrator = JobOrchestrator::new(
            Arc::clone(&store),
            context,
            config.orchestrator.clone(),
        );
        Self {
            store,
            orchestrator: Arc::new(orchestrator),
            retention: config.retention.clone(),
            running: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    fn lock_running(&self) -> MutexGuard<'_, HashMap<String, RunningJob>> {
        match self.running.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Running job table lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Validates the request, registers the job as `queued` and starts it in
    /// the background. Returns the job id immediately.
    pub fn start_job(&self, request: JobRequest) -> Result<String, SupervisorError> {
        let kind = request.kind();
        if let JobRequest::BatchParse { ref files } = request {
            if files.is_empty() {
                return Err(SupervisorError::EmptyBatch(kind));
            }
        }

        let now = Utc::now();
        let minted = self.store.next_id(kind, now);
        let job_id = minted.job_id.clone();

        let (metadata, total_items) = match &request {
            JobRequest::BatchParse { files } => (
                JobMetadata::BatchParse {
                    batch_number: minted.batch_number(),
                    batch_upload_datetime: now,
                },
                files.len(),
            ),
            JobRequest::BulkRegenerate {
                prompt_template_id,
                created_by,
            } => (
                JobMetadata::BulkRegenerate {
                    prompt_template_id: *prompt_template_id,
                    created_by: created_by.clone().unwrap_or_else(|| "system".to_string()),
                },
                0,
            ),
        };
        self.store
            .insert(Job::new(job_id.clone(), kind, metadata, total_items));

        let cancel = Arc::new(AtomicBool::new(false));
        let handle = self.spawn_run(&job_id, request, Arc::clone(&cancel))?;

        let mut running = self.lock_running();
        running.retain(|_, job| !job.handle.is_finished());
        running.insert(job_id.clone(), RunningJob { handle, cancel });

        info!("Started {} job {}", kind, job_id);
        Ok(job_id)
    }

    fn spawn_run(
        &self,
        job_id: &str,
        request: JobRequest,
        cancel: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, SupervisorError> {
        let store = Arc::clone(&self.store);
        let orchestrator = Arc::clone(&self.orchestrator);
        let id = job_id.to_string();

        let spawned = thread::Builder::new()
            .name(format!("hireflow-job-{}", job_id))
            .spawn(move || {
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| match request {
                    JobRequest::BatchParse { files } => {
                        orchestrator.run_batch_parse(&id, files, cancel)
                    }
                    JobRequest::BulkRegenerate { .. } => {
                        orchestrator.run_bulk_regeneration(&id, cancel)
                    }
                }));
                if let Err(panic) = outcome {
                    let message = panic_message(panic.as_ref());
                    error!("Job {} orchestration panicked: {}", id, message);
                    store.update(&id, |job| {
                        job.fail(Utc::now(), format!("Job orchestration panicked: {}", message))
                    });
                }
            });

        spawned.map_err(|e| {
            let message = format!("Failed to spawn job thread: {}", e);
            self.store
                .update(job_id, |job| job.fail(Utc::now(), message.clone()));
            SupervisorError::SpawnFailed(e.to_string())
        })
    }

    /// Snapshot of one job, `None` for unknown ids.
    pub fn get_job_status(&self, job_id: &str) -> Option<Job> {
        self.store.get(job_id)
    }

    /// All jobs of any status, newest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        self.store.get_all()
    }

    /// Cancels a queued or processing job. Items already running finish and
    /// are recorded; no new item is started.
    pub fn cancel_job(&self, job_id: &str) -> bool {
        let cancelled = self.store.cancel(job_id);
        if cancelled {
            if let Some(job) = self.lock_running().get(job_id) {
                job.cancel.store(true, Ordering::SeqCst);
            }
        }
        cancelled
    }

    /// Blocks until the job's background thread ends and returns its final
    /// snapshot.
    pub fn wait(&self, job_id: &str) -> Option<Job> {
        let running = self.lock_running().remove(job_id);
        if let Some(job) = running {
            if job.handle.join().is_err() {
                error!("Job thread for {} panicked", job_id);
            }
        }
        self.store.get(job_id)
    }

    /// Joins every job thread started so far.
    pub fn wait_all(&self) {
        let running: Vec<(String, RunningJob)> = self.lock_running().drain().collect();
        for (job_id, job) in running {
            if job.handle.join().is_err() {
                error!("Job thread for {} panicked", job_id);
            }
        }
    }

    /// Removes finished jobs older than the configured retention.
    pub fn cleanup_old_jobs(&self) -> usize {
        self.store
            .cleanup_finished(self.retention.max_age(), Utc::now())
    }

    /// Starts the periodic retention sweep. No-op when disabled in config or
    /// already running.
    pub fn start_sweeper(&self) -> Result<bool, SupervisorError> {
        let Some(interval) = self.retention.sweep_interval() else {
            return Ok(false);
        };
        let mut sweeper = match self.sweeper.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if sweeper.is_some() {
            return Ok(false);
        }

        let (stop, stopped) = bounded::<()>(1);
        let store = Arc::clone(&self.store);
        let max_age = self.retention.max_age();

        let handle = thread::Builder::new()
            .name("hireflow-sweeper".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = store.cleanup_finished(max_age, Utc::now());
                        debug!("Retention sweep removed {} jobs", removed);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| SupervisorError::SpawnFailed(e.to_string()))?;

        *sweeper = Some(Sweeper { stop, handle });
        info!("Retention sweeper running every {:?}", interval);
        Ok(true)
    }

    pub fn stop_sweeper(&self) {
        let sweeper = match self.sweeper.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sweeper) = sweeper {
            let _ = sweeper.stop.send(());
            if sweeper.handle.join().is_err() {
                error!("Retention sweeper panicked");
            }
        }
    }
}

impl Drop for JobSupervisor {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}
