//! Test harness running real jobs against an in-memory database.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use hireflow::candidate::{CareerEntry, NewCandidate, ParsedResume};
use hireflow::collaborators::ExecutionContext;
use hireflow::db::candidate_repo;
use hireflow::{
    CandidateId, Config, Database, Job, JobEventBroadcaster, JobRequest, JobStatus, JobStore,
    JobSupervisor, UploadedFile,
};

use super::builders::ConfigBuilder;
use super::doubles::Collaborators;

/// A supervisor wired to scripted collaborators and a fresh database.
pub struct TestHarness {
    pub db: Database,
    pub store: Arc<JobStore>,
    pub supervisor: JobSupervisor,
    pub collaborators: Collaborators,
}

impl TestHarness {
    /// Two workers, no throttling, default doubles.
    pub fn new() -> Self {
        Self::with(ConfigBuilder::new().build(), Collaborators::default())
    }

    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        Self::with(ConfigBuilder::new().build(), collaborators)
    }

    pub fn with(config: Config, collaborators: Collaborators) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let store = Arc::new(JobStore::with_events(JobEventBroadcaster::new(1024)));
        let context = ExecutionContext::new(
            collaborators.extractor.clone(),
            collaborators.classifier.clone(),
            collaborators.summarizer.clone(),
            Arc::new(db.clone()),
        );
        let supervisor = JobSupervisor::new(&config, Some(context), Arc::clone(&store));

        Self {
            db,
            store,
            supervisor,
            collaborators,
        }
    }

    /// Stores an active candidate and returns its id.
    pub fn seed_profile(&self, first: &str, last: &str) -> CandidateId {
        let candidate = NewCandidate {
            resume: ParsedResume {
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
                email: Some(format!("{}@example.com", first.to_lowercase())),
                skills: vec!["Rust".to_string(), "SQL".to_string()],
                career_history: vec![CareerEntry {
                    job_title: Some("Engineer".to_string()),
                    company_name: Some("Acme".to_string()),
                    start_date: Some("2020-01".to_string()),
                    ..CareerEntry::default()
                }],
                ..ParsedResume::default()
            },
            classification: None,
            remarks: None,
            metadata: serde_json::json!({}),
            resume_file: None,
        };
        candidate_repo::insert_candidate(&self.db, &candidate).expect("Failed to seed profile")
    }

    pub fn start_batch(&self, files: Vec<UploadedFile>) -> String {
        self.supervisor
            .start_job(JobRequest::BatchParse { files })
            .expect("Failed to start batch job")
    }

    pub fn start_regeneration(&self, prompt_template_id: Option<i64>) -> String {
        self.supervisor
            .start_job(JobRequest::BulkRegenerate {
                prompt_template_id,
                created_by: Some("tester".to_string()),
            })
            .expect("Failed to start regeneration job")
    }

    /// Joins the job thread and returns the final snapshot.
    pub fn finish(&self, job_id: &str) -> Job {
        self.supervisor.wait(job_id).expect("Job disappeared")
    }

    /// Polls until `predicate` holds for the job or `timeout` passes.
    pub fn wait_until<F>(&self, job_id: &str, timeout: Duration, predicate: F) -> Job
    where
        F: Fn(&Job) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let job = self.supervisor.get_job_status(job_id).expect("Job disappeared");
            if predicate(&job) {
                return job;
            }
            assert!(
                Instant::now() < deadline,
                "Timed out waiting on job {} (status {}, {}/{} processed)",
                job_id,
                job.status,
                job.processed_items,
                job.total_items
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Polls until the job reaches a terminal status.
    pub fn wait_terminal(&self, job_id: &str, timeout: Duration) -> Job {
        self.wait_until(job_id, timeout, |job| job.status.is_terminal())
    }

    pub fn metadata_json(&self, candidate_id: CandidateId) -> serde_json::Value {
        self.db
            .with_conn(|conn| {
                let raw: String = conn.query_row(
                    "SELECT metadata_json FROM candidate_profiles WHERE id = ?1",
                    [candidate_id],
                    |row| row.get(0),
                )?;
                Ok(raw)
            })
            .map(|raw| serde_json::from_str(&raw).expect("metadata is JSON"))
            .expect("Failed to read metadata")
    }

    pub fn remarks(&self, candidate_id: CandidateId) -> Option<String> {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT remarks FROM candidate_profiles WHERE id = ?1",
                    [candidate_id],
                    |row| row.get(0),
                )?)
            })
            .expect("Failed to read remarks")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Asserts a terminal status with a readable failure message.
pub fn assert_status(job: &Job, expected: JobStatus) {
    assert_eq!(
        job.status, expected,
        "job {} ended {} with errors {:?}",
        job.id, job.status, job.errors
    );
}
