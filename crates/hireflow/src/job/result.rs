//! Per-item result records produced by the item processors.

use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, MandatoryField, ProfileStatus};
use crate::error::{CollaboratorError, Stage};
use crate::job::status::ItemOutcome;

/// Outcome of parsing one uploaded resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub filename: String,
    pub file_size: u64,
    pub status: ItemOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<CandidateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_status: Option<ProfileStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<MandatoryField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsing_method: Option<String>,
    pub classification_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_error: Option<String>,
    pub ai_summary_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary_error: Option<String>,
    /// Stage that failed the item, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ParseResult {
    /// A result in its initial failed state; the processor upgrades it.
    pub fn pending(filename: &str, file_size: u64) -> Self {
        Self {
            filename: filename.to_string(),
            file_size,
            status: ItemOutcome::Failed,
            candidate_id: None,
            profile_status: None,
            missing_fields: vec![],
            parsing_method: None,
            classification_generated: false,
            classification_reasoning: None,
            classification_error: None,
            ai_summary_generated: false,
            ai_summary_error: None,
            failed_stage: None,
            errors: vec![],
        }
    }

    pub fn failure(filename: &str, file_size: u64, error: &CollaboratorError) -> Self {
        let mut result = Self::pending(filename, file_size);
        result.fail(error);
        result
    }

    pub fn fail(&mut self, error: &CollaboratorError) {
        self.status = ItemOutcome::Failed;
        self.failed_stage = Some(error.stage);
        self.errors
            .push(format!("Failed to process {}: {}", self.filename, error));
    }
}

/// Outcome of regenerating one stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationResult {
    pub candidate_id: CandidateId,
    pub status: ItemOutcome,
    pub summary_updated: bool,
    pub embedding_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegenerationResult {
    pub fn success(candidate_id: CandidateId, summary_updated: bool, embedding_updated: bool) -> Self {
        Self {
            candidate_id,
            status: ItemOutcome::Success,
            summary_updated,
            embedding_updated,
            failed_stage: None,
            error: None,
        }
    }

    pub fn failure(candidate_id: CandidateId, error: &CollaboratorError) -> Self {
        Self {
            candidate_id,
            status: ItemOutcome::Failed,
            summary_updated: false,
            embedding_updated: false,
            failed_stage: Some(error.stage),
            error: Some(error.message.clone()),
        }
    }
}

/// A per-item record as stored on the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemResult {
    Parse(ParseResult),
    Regeneration(RegenerationResult),
}

impl ItemResult {
    pub fn outcome(&self) -> ItemOutcome {
        match self {
            ItemResult::Parse(r) => r.status,
            ItemResult::Regeneration(r) => r.status,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome() == ItemOutcome::Success
    }

    /// Identifies the input item for retries.
    pub fn item_ref(&self) -> String {
        match self {
            ItemResult::Parse(r) => r.filename.clone(),
            ItemResult::Regeneration(r) => r.candidate_id.to_string(),
        }
    }
}

impl From<ParseResult> for ItemResult {
    fn from(result: ParseResult) -> Self {
        ItemResult::Parse(result)
    }
}

impl From<RegenerationResult> for ItemResult {
    fn from(result: RegenerationResult) -> Self {
        ItemResult::Regeneration(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_records_stage() {
        let err = CollaboratorError::extraction("unreadable");
        let result = ParseResult::failure("cv.pdf", 42, &err);

        assert_eq!(result.status, ItemOutcome::Failed);
        assert_eq!(result.failed_stage, Some(Stage::Extraction));
        assert_eq!(
            result.errors,
            vec!["Failed to process cv.pdf: extraction failed: unreadable".to_string()]
        );
    }

    #[test]
    fn test_item_result_tagged_serialization() {
        let result: ItemResult = RegenerationResult::success(7, true, true).into();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "regeneration");
        assert_eq!(json["candidate_id"], 7);
        assert_eq!(json["status"], "success");
        assert!(json.get("error").is_none());
        assert_eq!(result.item_ref(), "7");
    }
}
