//! Item processors for the two job kinds.

pub mod batch_parse;
pub mod regenerate;

pub use batch_parse::{BatchParseProcessor, UploadedFile};
pub use regenerate::RegenerationProcessor;

use tracing::Instrument;

use crate::candidate::{AiProfileUpdate, CandidateProfile};
use crate::collaborators::{CollaboratorResult, ExecutionContext};
use crate::error::{CollaboratorError, Stage};

/// Summarizes `profile` and embeds the summary. Either both calls succeed or
/// the first failure is returned. Blank outputs are dropped so they never
/// replace stored values; an update with nothing left is a failure.
pub(crate) async fn generate_ai_update(
    context: &ExecutionContext,
    profile: &CandidateProfile,
) -> CollaboratorResult<AiProfileUpdate> {
    let summary = context
        .summarizer
        .summarize(profile)
        .instrument(tracing::info_span!("summarize"))
        .await
        .map_err(|e| restage(e, Stage::Summarization))?;

    let embedding = context
        .summarizer
        .embed(&summary)
        .instrument(tracing::info_span!("embed"))
        .await
        .map_err(|e| restage(e, Stage::Embedding))?;

    let update = AiProfileUpdate {
        summary: Some(summary).filter(|s| !s.trim().is_empty()),
        embedding: Some(embedding).filter(|v| !v.is_empty()),
    };
    if update.is_empty() {
        return Err(CollaboratorError::summarization(
            "no AI summary or embedding generated",
        ));
    }
    Ok(update)
}

/// Attributes a collaborator error to the call that was being made.
pub(crate) fn restage(error: CollaboratorError, stage: Stage) -> CollaboratorError {
    if error.stage == stage {
        error
    } else {
        CollaboratorError::new(stage, error.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::collaborators::tests_support::Unavailable;
    use crate::collaborators::ProfileSummarizer;

    struct FixedSummarizer {
        summary: &'static str,
        embedding: Vec<f32>,
    }

    #[async_trait]
    impl ProfileSummarizer for FixedSummarizer {
        async fn summarize(&self, _profile: &CandidateProfile) -> CollaboratorResult<String> {
            Ok(self.summary.to_string())
        }

        async fn embed(&self, _text: &str) -> CollaboratorResult<Vec<f32>> {
            Ok(self.embedding.clone())
        }
    }

    fn generate(summary: &'static str, embedding: Vec<f32>) -> CollaboratorResult<AiProfileUpdate> {
        let unavailable = Arc::new(Unavailable);
        let context = ExecutionContext::new(
            unavailable.clone(),
            unavailable.clone(),
            Arc::new(FixedSummarizer { summary, embedding }),
            unavailable,
        );
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(generate_ai_update(&context, &CandidateProfile::default()))
    }

    #[test]
    fn test_full_update() {
        let update = generate("Seasoned engineer.", vec![0.1, 0.2]).unwrap();
        assert_eq!(update.summary.as_deref(), Some("Seasoned engineer."));
        assert_eq!(update.embedding, Some(vec![0.1, 0.2]));
    }

    #[test]
    fn test_blank_summary_is_not_written() {
        let update = generate("   ", vec![1.0; 4]).unwrap();
        assert_eq!(update.summary, None);
        assert_eq!(update.embedding, Some(vec![1.0; 4]));
    }

    #[test]
    fn test_empty_embedding_is_not_written() {
        let update = generate("Seasoned engineer.", vec![]).unwrap();
        assert_eq!(update.summary.as_deref(), Some("Seasoned engineer."));
        assert_eq!(update.embedding, None);
    }

    #[test]
    fn test_nothing_generated_is_a_summarization_failure() {
        let err = generate(" ", vec![]).unwrap_err();
        assert_eq!(err.stage, Stage::Summarization);
        assert!(err.message.contains("no AI summary or embedding"));
    }
}
