//! The job record: the unit of observation and control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::result::ItemResult;
use crate::job::status::{JobKind, JobStatus};

/// Counters specific to resume parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParseStats {
    pub completed_profiles: usize,
    pub incomplete_profiles: usize,
    pub ai_summaries_generated: usize,
    pub ai_summaries_failed: usize,
    pub classifications_generated: usize,
    pub classifications_failed: usize,
}

/// Counters specific to profile regeneration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationStats {
    pub successful_updates: usize,
    pub failed_updates: usize,
    /// Most recently dispatched item. Advisory: concurrent workers race on it.
    pub current_item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStats {
    BatchParse(BatchParseStats),
    BulkRegenerate(RegenerationStats),
}

impl JobStats {
    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::BatchParse => JobStats::BatchParse(BatchParseStats::default()),
            JobKind::BulkRegenerate => JobStats::BulkRegenerate(RegenerationStats::default()),
        }
    }

    fn tally(&mut self, result: &ItemResult) {
        match (self, result) {
            (JobStats::BatchParse(stats), ItemResult::Parse(r)) => {
                if !result.succeeded() {
                    return;
                }
                match r.profile_status {
                    Some(crate::candidate::ProfileStatus::Incomplete) => {
                        stats.incomplete_profiles += 1
                    }
                    _ => stats.completed_profiles += 1,
                }
                if r.ai_summary_generated {
                    stats.ai_summaries_generated += 1;
                } else {
                    stats.ai_summaries_failed += 1;
                }
                if r.classification_generated {
                    stats.classifications_generated += 1;
                } else {
                    stats.classifications_failed += 1;
                }
            }
            (JobStats::BulkRegenerate(stats), ItemResult::Regeneration(_)) => {
                if result.succeeded() {
                    stats.successful_updates += 1;
                } else {
                    stats.failed_updates += 1;
                }
            }
            (stats, result) => {
                log::warn!(
                    "Ignoring {} result for job stats of another kind ({:?})",
                    result.item_ref(),
                    std::mem::discriminant(stats)
                );
            }
        }
    }
}

/// Operator-supplied context attached to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMetadata {
    BatchParse {
        batch_number: String,
        batch_upload_datetime: DateTime<Utc>,
    },
    BulkRegenerate {
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt_template_id: Option<i64>,
        created_by: String,
    },
}

/// Snapshot of one orchestrated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub total_items: usize,
    pub processed_items: usize,
    pub successful_items: usize,
    pub failed_items: usize,
    pub progress_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    pub stats: JobStats,
    pub metadata: JobMetadata,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub results: Vec<ItemResult>,
}

impl Job {
    /// Creates a job in `queued` state.
    pub fn new(id: String, kind: JobKind, metadata: JobMetadata, total_items: usize) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            total_items,
            processed_items: 0,
            successful_items: 0,
            failed_items: 0,
            progress_percentage: 0.0,
            estimated_completion: None,
            processing_time_seconds: None,
            stats: JobStats::for_kind(kind),
            metadata,
            errors: vec![],
            results: vec![],
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// `queued → processing`. Returns false when the job already moved on.
    pub fn mark_processing(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Processing;
        self.started_at.get_or_insert(now);
        true
    }

    /// Sets the item count once it is known (regeneration fetches it late).
    pub fn set_total_items(&mut self, total: usize) {
        if self.status.is_active() && self.processed_items == 0 {
            self.total_items = total;
        }
    }

    pub fn set_current_item(&mut self, item_id: &str) {
        if self.status != JobStatus::Processing {
            return;
        }
        if let JobStats::BulkRegenerate(stats) = &mut self.stats {
            stats.current_item_id = Some(item_id.to_string());
        }
    }

    /// Folds one consumed item result into the counters.
    ///
    /// Accepted while processing, and after a cancellation for items that
    /// were already in flight.
    pub fn record_result(&mut self, result: ItemResult, escaped_error: Option<String>) -> bool {
        if !matches!(self.status, JobStatus::Processing | JobStatus::Cancelled) {
            return false;
        }
        if self.processed_items >= self.total_items {
            log::warn!(
                "Job {} received more results than items ({}), dropping {}",
                self.id,
                self.total_items,
                result.item_ref()
            );
            return false;
        }

        self.processed_items += 1;
        if result.succeeded() {
            self.successful_items += 1;
        } else {
            self.failed_items += 1;
        }
        self.stats.tally(&result);
        if let Some(error) = escaped_error {
            self.errors.push(error);
        }
        self.results.push(result);
        self.progress_percentage = self.progress_percentage.max(self.computed_progress());
        true
    }

    /// Recomputes the ETA from the average wall-clock time per consumed item.
    pub fn update_estimate(&mut self, now: DateTime<Utc>, elapsed: std::time::Duration) {
        if self.status != JobStatus::Processing || self.processed_items == 0 {
            return;
        }
        let remaining = self.total_items.saturating_sub(self.processed_items) as f64;
        let per_item = elapsed.as_secs_f64() / self.processed_items as f64;
        let eta_ms = (per_item * remaining * 1000.0).round() as i64;
        self.estimated_completion = Some(now + chrono::Duration::milliseconds(eta_ms));
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        if !self.is_finished() {
            self.errors.push(error.into());
        }
    }

    /// `processing → completed`.
    pub fn complete(&mut self, now: DateTime<Utc>, processing_time: Option<std::time::Duration>) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.status = JobStatus::Completed;
        self.completed_at.get_or_insert(now);
        self.progress_percentage = 100.0;
        self.estimated_completion = None;
        self.processing_time_seconds =
            processing_time.map(|d| (d.as_secs_f64() * 100.0).round() / 100.0);
        true
    }

    /// Setup failure: `queued | processing → failed`.
    pub fn fail(&mut self, now: DateTime<Utc>, error: impl Into<String>) -> bool {
        if !self.status.is_active() {
            return false;
        }
        self.errors.push(error.into());
        self.status = JobStatus::Failed;
        self.completed_at.get_or_insert(now);
        self.estimated_completion = None;
        true
    }

    /// Caller-requested cancellation, only from `queued | processing`.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.is_active() {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.completed_at.get_or_insert(now);
        self.estimated_completion = None;
        true
    }

    /// `processed / total * 100`, one decimal.
    pub fn computed_progress(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        let raw = self.processed_items as f64 / self.total_items as f64 * 100.0;
        (raw * 10.0).round() / 10.0
    }

    pub fn parse_stats(&self) -> Option<&BatchParseStats> {
        match &self.stats {
            JobStats::BatchParse(stats) => Some(stats),
            JobStats::BulkRegenerate(_) => None,
        }
    }

    pub fn regeneration_stats(&self) -> Option<&RegenerationStats> {
        match &self.stats {
            JobStats::BulkRegenerate(stats) => Some(stats),
            JobStats::BatchParse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::ProfileStatus;
    use crate::error::CollaboratorError;
    use crate::job::result::{ParseResult, RegenerationResult};
    use crate::job::status::ItemOutcome;

    fn regen_job(total: usize) -> Job {
        Job::new(
            "bulk_regen_test_1".to_string(),
            JobKind::BulkRegenerate,
            JobMetadata::BulkRegenerate {
                prompt_template_id: None,
                created_by: "system".to_string(),
            },
            total,
        )
    }

    fn parse_job(total: usize) -> Job {
        Job::new(
            "batch_parse_test_1".to_string(),
            JobKind::BatchParse,
            JobMetadata::BatchParse {
                batch_number: "BATCH_test_1".to_string(),
                batch_upload_datetime: Utc::now(),
            },
            total,
        )
    }

    fn parsed(profile_status: ProfileStatus, summary: bool, classification: bool) -> ItemResult {
        let mut result = ParseResult::pending("cv.pdf", 10);
        result.status = ItemOutcome::Success;
        result.profile_status = Some(profile_status);
        result.ai_summary_generated = summary;
        result.classification_generated = classification;
        result.into()
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = regen_job(3);
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.started_at.is_none());
        assert_eq!(job.progress_percentage, 0.0);
        assert_eq!(job.regeneration_stats(), Some(&RegenerationStats::default()));
    }

    #[test]
    fn test_started_at_set_once() {
        let mut job = regen_job(1);
        let first = Utc::now();
        assert!(job.mark_processing(first));
        assert!(!job.mark_processing(first + chrono::Duration::seconds(5)));
        assert_eq!(job.started_at, Some(first));
    }

    #[test]
    fn test_results_ignored_before_processing() {
        let mut job = regen_job(1);
        assert!(!job.record_result(RegenerationResult::success(1, true, true).into(), None));
        assert_eq!(job.processed_items, 0);
    }

    #[test]
    fn test_progress_and_counters() {
        let mut job = regen_job(3);
        job.mark_processing(Utc::now());

        job.record_result(RegenerationResult::success(1, true, true).into(), None);
        assert_eq!(job.progress_percentage, 33.3);

        let err = CollaboratorError::summarization("rate limited");
        job.record_result(RegenerationResult::failure(2, &err).into(), None);
        assert_eq!(job.progress_percentage, 66.7);

        job.record_result(RegenerationResult::success(3, true, false).into(), None);
        assert_eq!(job.progress_percentage, 100.0);

        assert_eq!(job.processed_items, 3);
        assert_eq!(job.successful_items, 2);
        assert_eq!(job.failed_items, 1);
        let stats = job.regeneration_stats().unwrap();
        assert_eq!(stats.successful_updates, 2);
        assert_eq!(stats.failed_updates, 1);
        assert!(job.errors.is_empty());
    }

    #[test]
    fn test_parse_stats_tally() {
        let mut job = parse_job(4);
        job.mark_processing(Utc::now());

        job.record_result(parsed(ProfileStatus::Completed, true, true), None);
        job.record_result(parsed(ProfileStatus::Incomplete, false, true), None);
        job.record_result(parsed(ProfileStatus::Completed, true, false), None);
        let err = CollaboratorError::extraction("bad file");
        job.record_result(
            ParseResult::failure("broken.pdf", 1, &err).into(),
            Some("broken.pdf: worker panicked".to_string()),
        );

        let stats = job.parse_stats().unwrap();
        assert_eq!(stats.completed_profiles, 2);
        assert_eq!(stats.incomplete_profiles, 1);
        assert_eq!(stats.ai_summaries_generated, 2);
        assert_eq!(stats.ai_summaries_failed, 1);
        assert_eq!(stats.classifications_generated, 2);
        assert_eq!(stats.classifications_failed, 1);
        assert_eq!(
            stats.completed_profiles + stats.incomplete_profiles,
            job.successful_items
        );
        assert_eq!(job.failed_items, 1);
        assert_eq!(job.errors, vec!["broken.pdf: worker panicked".to_string()]);
        assert_eq!(job.results.len(), 4);
    }

    #[test]
    fn test_complete_sets_full_progress() {
        let mut job = regen_job(0);
        job.mark_processing(Utc::now());
        assert!(job.complete(Utc::now(), Some(std::time::Duration::from_millis(1234))));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percentage, 100.0);
        assert_eq!(job.processing_time_seconds, Some(1.23));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_cancel_only_from_active_states() {
        let mut job = regen_job(2);
        assert!(job.cancel(Utc::now()));
        assert_eq!(job.status, JobStatus::Cancelled);
        let snapshot = job.clone();

        assert!(!job.cancel(Utc::now()));
        assert!(!job.complete(Utc::now(), None));
        assert!(!job.fail(Utc::now(), "late failure"));
        assert_eq!(job, snapshot);
    }

    #[test]
    fn test_in_flight_results_recorded_after_cancel() {
        let mut job = regen_job(2);
        job.mark_processing(Utc::now());
        job.cancel(Utc::now());
        let completed_at = job.completed_at;

        assert!(job.record_result(RegenerationResult::success(1, true, true).into(), None));
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.processed_items, 1);
        assert_eq!(job.completed_at, completed_at);
    }

    #[test]
    fn test_estimate_uses_average_item_time() {
        let mut job = regen_job(4);
        let now = Utc::now();
        job.mark_processing(now);
        job.record_result(RegenerationResult::success(1, true, true).into(), None);

        job.update_estimate(now, std::time::Duration::from_secs(2));
        assert_eq!(job.estimated_completion, Some(now + chrono::Duration::seconds(6)));
    }

    #[test]
    fn test_current_item_only_for_regeneration() {
        let mut job = parse_job(1);
        job.mark_processing(Utc::now());
        job.set_current_item("cv.pdf");
        assert!(job.regeneration_stats().is_none());

        let mut job = regen_job(1);
        job.mark_processing(Utc::now());
        job.set_current_item("42");
        assert_eq!(
            job.regeneration_stats().unwrap().current_item_id.as_deref(),
            Some("42")
        );
    }
}
