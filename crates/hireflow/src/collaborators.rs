//! Narrow interfaces to the external services the item processors call.
//!
//! Implementations live outside this crate except for [`CandidateRepository`],
//! which [`crate::db::Database`] implements on SQLite.

use std::sync::Arc;

use async_trait::async_trait;

use crate::candidate::{
    AiProfileUpdate, CandidateId, CandidateProfile, Classification, NewCandidate, ParsedResume,
};
use crate::error::CollaboratorError;

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Name of the extraction backend, recorded on every created candidate.
    fn method(&self) -> &str;

    async fn extract(&self, file_name: &str, bytes: &[u8]) -> CollaboratorResult<ParsedResume>;
}

#[async_trait]
pub trait CandidateClassifier: Send + Sync {
    async fn classify(&self, resume: &ParsedResume) -> CollaboratorResult<Classification>;
}

#[async_trait]
pub trait ProfileSummarizer: Send + Sync {
    async fn summarize(&self, profile: &CandidateProfile) -> CollaboratorResult<String>;

    /// Returns a fixed-length embedding for `text`.
    async fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>>;
}

/// Candidate persistence. Each call commits or rolls back on its own.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn create_candidate(&self, candidate: NewCandidate) -> CollaboratorResult<CandidateId>;

    async fn update_ai_fields(
        &self,
        id: CandidateId,
        update: &AiProfileUpdate,
    ) -> CollaboratorResult<()>;

    /// Loads the profile with only its active child records.
    async fn load_profile(&self, id: CandidateId) -> CollaboratorResult<CandidateProfile>;

    async fn list_active_profile_ids(&self) -> CollaboratorResult<Vec<CandidateId>>;

    async fn activate_prompt_template(&self, template_id: i64) -> CollaboratorResult<()>;
}

/// Collaborator handles shared by every worker of every job.
#[derive(Clone)]
pub struct ExecutionContext {
    pub extractor: Arc<dyn DocumentExtractor>,
    pub classifier: Arc<dyn CandidateClassifier>,
    pub summarizer: Arc<dyn ProfileSummarizer>,
    pub repository: Arc<dyn CandidateRepository>,
}

impl ExecutionContext {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        classifier: Arc<dyn CandidateClassifier>,
        summarizer: Arc<dyn ProfileSummarizer>,
        repository: Arc<dyn CandidateRepository>,
    ) -> Self {
        Self {
            extractor,
            classifier,
            summarizer,
            repository,
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("extractor", &self.extractor.method())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    /// Collaborator that refuses every call, for tests that never reach one.
    pub(crate) struct Unavailable;

    fn refused<T>(stage: crate::error::Stage) -> CollaboratorResult<T> {
        Err(CollaboratorError::new(stage, "collaborator unavailable in tests"))
    }

    #[async_trait]
    impl DocumentExtractor for Unavailable {
        fn method(&self) -> &str {
            "unavailable"
        }

        async fn extract(&self, _file_name: &str, _bytes: &[u8]) -> CollaboratorResult<ParsedResume> {
            refused(crate::error::Stage::Extraction)
        }
    }

    #[async_trait]
    impl CandidateClassifier for Unavailable {
        async fn classify(&self, _resume: &ParsedResume) -> CollaboratorResult<Classification> {
            refused(crate::error::Stage::Classification)
        }
    }

    #[async_trait]
    impl ProfileSummarizer for Unavailable {
        async fn summarize(&self, _profile: &CandidateProfile) -> CollaboratorResult<String> {
            refused(crate::error::Stage::Summarization)
        }

        async fn embed(&self, _text: &str) -> CollaboratorResult<Vec<f32>> {
            refused(crate::error::Stage::Embedding)
        }
    }

    #[async_trait]
    impl CandidateRepository for Unavailable {
        async fn create_candidate(&self, _candidate: NewCandidate) -> CollaboratorResult<CandidateId> {
            refused(crate::error::Stage::Persistence)
        }

        async fn update_ai_fields(
            &self,
            _id: CandidateId,
            _update: &AiProfileUpdate,
        ) -> CollaboratorResult<()> {
            refused(crate::error::Stage::Persistence)
        }

        async fn load_profile(&self, _id: CandidateId) -> CollaboratorResult<CandidateProfile> {
            refused(crate::error::Stage::Loading)
        }

        async fn list_active_profile_ids(&self) -> CollaboratorResult<Vec<CandidateId>> {
            refused(crate::error::Stage::Loading)
        }

        async fn activate_prompt_template(&self, _template_id: i64) -> CollaboratorResult<()> {
            refused(crate::error::Stage::Persistence)
        }
    }

    pub(crate) fn unused_context() -> ExecutionContext {
        let unavailable = Arc::new(Unavailable);
        ExecutionContext::new(
            unavailable.clone(),
            unavailable.clone(),
            unavailable.clone(),
            unavailable,
        )
    }
}
