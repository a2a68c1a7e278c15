use async_trait::async_trait;
use tracing::{info_span, warn, Instrument};

use crate::candidate::CandidateId;
use crate::collaborators::ExecutionContext;
use crate::error::{CollaboratorError, Stage};
use crate::job::{ItemResult, RegenerationResult};
use crate::processors::{generate_ai_update, restage};
use crate::worker::ItemProcessor;

/// Recomputes the AI summary and embedding of stored profiles.
pub struct RegenerationProcessor {
    job_id: String,
}

impl RegenerationProcessor {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }

    async fn regenerate(
        &self,
        candidate_id: CandidateId,
        context: &ExecutionContext,
    ) -> Result<RegenerationResult, CollaboratorError> {
        let profile = context
            .repository
            .load_profile(candidate_id)
            .instrument(info_span!("load_profile"))
            .await
            .map_err(|e| restage(e, Stage::Loading))?;

        let update = generate_ai_update(context, &profile).await?;

        context
            .repository
            .update_ai_fields(candidate_id, &update)
            .instrument(info_span!("update_profile"))
            .await
            .map_err(|e| restage(e, Stage::Persistence))?;

        Ok(RegenerationResult::success(
            candidate_id,
            update.summary.is_some(),
            update.embedding.is_some(),
        ))
    }
}

#[async_trait]
impl ItemProcessor for RegenerationProcessor {
    type Item = CandidateId;

    fn item_ref(&self, item: &CandidateId) -> String {
        item.to_string()
    }

    async fn process(&self, item: &CandidateId, context: &ExecutionContext) -> ItemResult {
        let span = info_span!("regenerate_profile", job_id = %self.job_id, candidate_id = *item);
        match self.regenerate(*item, context).instrument(span).await {
            Ok(result) => result.into(),
            Err(e) => {
                warn!("Regeneration failed for candidate {}: {}", item, e);
                RegenerationResult::failure(*item, &e).into()
            }
        }
    }

    fn escaped(&self, item: &CandidateId, error: &CollaboratorError) -> ItemResult {
        RegenerationResult::failure(*item, error).into()
    }
}
