//! Runs one job from `queued` to a terminal state.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use chrono::Utc;
use log::{debug, error, info, warn};
use tracing::info_span;

use crate::broadcast::JobStore;
use crate::collaborators::ExecutionContext;
use crate::config::OrchestratorConfig;
use crate::job::{JobMetadata, JobStatus};
use crate::processors::{BatchParseProcessor, RegenerationProcessor, UploadedFile};
use crate::worker::{DispatchHook, ItemProcessor, WorkerPool};

const MISSING_CONTEXT: &str = "Execution context unavailable: collaborators were not configured";

/// Drives a job's items through a [`WorkerPool`] and folds the results into
/// the job record. One orchestrator call per job, on that job's own thread.
pub struct JobOrchestrator {
    store: Arc<JobStore>,
    context: Option<ExecutionContext>,
    config: OrchestratorConfig,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        context: Option<ExecutionContext>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            context,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Parses `files` for the queued batch job `job_id`.
    pub fn run_batch_parse(&self, job_id: &str, files: Vec<UploadedFile>, cancel: Arc<AtomicBool>) {
        let _span = info_span!("batch_parse_job", job_id = %job_id, files = files.len()).entered();

        let Some(context) = self.require_context(job_id) else {
            return;
        };

        let (batch_number, uploaded_at) = match self.store.get(job_id).map(|j| j.metadata) {
            Some(JobMetadata::BatchParse {
                batch_number,
                batch_upload_datetime,
            }) => (batch_number, batch_upload_datetime),
            Some(_) => {
                self.fail(job_id, "Job metadata does not describe a batch parse");
                return;
            }
            None => {
                warn!("Job {} vanished before it started", job_id);
                return;
            }
        };

        let started = Instant::now();
        if !self.start_processing(job_id, None) {
            return;
        }
        info!(
            "Batch {} started: {} files, {} workers",
            batch_number,
            files.len(),
            self.config.worker_count()
        );

        let processor = BatchParseProcessor::new(job_id, batch_number, uploaded_at);
        self.drive(job_id, processor, files, context, cancel, started);
    }

    /// Regenerates AI fields for every active profile.
    pub fn run_bulk_regeneration(&self, job_id: &str, cancel: Arc<AtomicBool>) {
        let _span = info_span!("bulk_regeneration_job", job_id = %job_id).entered();

        let Some(context) = self.require_context(job_id) else {
            return;
        };

        let prompt_template_id = match self.store.get(job_id).map(|j| j.metadata) {
            Some(JobMetadata::BulkRegenerate {
                prompt_template_id, ..
            }) => prompt_template_id,
            Some(_) => {
                self.fail(job_id, "Job metadata does not describe a bulk regeneration");
                return;
            }
            None => {
                warn!("Job {} vanished before it started", job_id);
                return;
            }
        };

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                self.fail(job_id, format!("Failed to start setup runtime: {}", e));
                return;
            }
        };

        if let Some(template_id) = prompt_template_id {
            match runtime.block_on(context.repository.activate_prompt_template(template_id)) {
                Ok(()) => info!("Activated prompt template {}", template_id),
                Err(e) => {
                    warn!("Prompt template {} not activated: {}", template_id, e);
                    self.store.update(job_id, |job| {
                        job.push_error(format!(
                            "Warning: failed to activate prompt template {}: {}",
                            template_id, e
                        ))
                    });
                }
            }
        }

        let profile_ids = match runtime.block_on(context.repository.list_active_profile_ids()) {
            Ok(ids) => ids,
            Err(e) => {
                self.fail(job_id, format!("Failed to fetch profiles: {}", e));
                return;
            }
        };
        drop(runtime);

        if self.store.is_cancelled(job_id) {
            info!("Job {} cancelled before processing", job_id);
            return;
        }

        let started = Instant::now();
        if !self.start_processing(job_id, Some(profile_ids.len())) {
            return;
        }

        if profile_ids.is_empty() {
            info!("No active profiles to regenerate");
            self.finish(job_id, started);
            return;
        }
        info!(
            "Regenerating {} profiles with {} workers",
            profile_ids.len(),
            self.config.worker_count()
        );

        let processor = RegenerationProcessor::new(job_id);
        self.drive(job_id, processor, profile_ids, context, cancel, started);
    }

    fn require_context(&self, job_id: &str) -> Option<ExecutionContext> {
        if self.context.is_none() {
            self.fail(job_id, MISSING_CONTEXT);
        }
        self.context.clone()
    }

    /// Moves the job to `processing`, fixing its item count first when it
    /// was only known now. False when the job was cancelled meanwhile.
    fn start_processing(&self, job_id: &str, total_items: Option<usize>) -> bool {
        let started = self
            .store
            .update(job_id, |job| {
                if let Some(total) = total_items {
                    job.set_total_items(total);
                }
                job.mark_processing(Utc::now())
            })
            .unwrap_or(false);
        if !started {
            info!("Job {} not started: no longer queued", job_id);
        }
        started
    }

    fn drive<P: ItemProcessor>(
        &self,
        job_id: &str,
        processor: P,
        items: Vec<P::Item>,
        context: ExecutionContext,
        cancel: Arc<AtomicBool>,
        started: Instant,
    ) {
        let hook: DispatchHook = {
            let store = Arc::clone(&self.store);
            let job_id = job_id.to_string();
            Arc::new(move |item_ref: &str| {
                store.update(&job_id, |job| job.set_current_item(item_ref));
            })
        };

        let pool = match WorkerPool::start(
            Arc::new(processor),
            items,
            context,
            self.config.worker_count(),
            cancel,
            Some(hook),
        ) {
            Ok(pool) => pool,
            Err(e) => {
                self.fail(job_id, format!("Failed to start workers: {}", e));
                return;
            }
        };

        let delay = self.config.rate_limit_delay();

        while let Some(output) = pool.recv_result() {
            debug!("Job {} consumed {}", job_id, output.item_ref);
            let recorded = self
                .store
                .update(job_id, |job| {
                    let recorded = job.record_result(output.result, output.escaped_error);
                    job.update_estimate(Utc::now(), started.elapsed());
                    recorded
                })
                .unwrap_or(false);
            if !recorded {
                warn!("Job {} dropped result for {}", job_id, output.item_ref);
            }

            if self.store.is_cancelled(job_id) {
                pool.cancel();
            }
            if !pool.is_cancelled() && !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        pool.wait();
        self.finish(job_id, started);
    }

    fn finish(&self, job_id: &str, started: Instant) {
        let snapshot = self.store.update(job_id, |job| {
            job.complete(Utc::now(), Some(started.elapsed()));
            (job.status, job.successful_items, job.failed_items)
        });

        match snapshot {
            Some((JobStatus::Completed, ok, failed)) => {
                info!(
                    "Job {} completed: {} succeeded, {} failed in {:.2}s",
                    job_id,
                    ok,
                    failed,
                    started.elapsed().as_secs_f64()
                );
            }
            Some((status, ok, failed)) => {
                info!(
                    "Job {} ended {} after {} succeeded, {} failed",
                    job_id, status, ok, failed
                );
            }
            None => warn!("Job {} vanished while running", job_id),
        }
    }

    fn fail(&self, job_id: &str, message: impl Into<String>) {
        let message = message.into();
        error!("Job {} failed: {}", job_id, message);
        self.store
            .update(job_id, |job| job.fail(Utc::now(), message.clone()));
    }
}
