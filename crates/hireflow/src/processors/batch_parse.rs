use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info_span, warn, Instrument};

use crate::candidate::{NewCandidate, ProfileStatus, ResumeFile};
use crate::collaborators::ExecutionContext;
use crate::error::{CollaboratorError, Stage};
use crate::job::{ItemOutcome, ItemResult, ParseResult};
use crate::processors::{generate_ai_update, restage};
use crate::sanitize;
use crate::worker::ItemProcessor;

const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

/// One uploaded resume.
#[derive(Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub size: u64,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            filename: filename.into(),
            bytes,
            size,
        }
    }

    /// Content type guessed from the file name.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .field("size", &self.size)
            .finish()
    }
}

/// Turns uploaded resumes into stored candidates.
pub struct BatchParseProcessor {
    job_id: String,
    batch_number: String,
    batch_upload_datetime: DateTime<Utc>,
}

impl BatchParseProcessor {
    pub fn new(
        job_id: impl Into<String>,
        batch_number: impl Into<String>,
        batch_upload_datetime: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            batch_number: batch_number.into(),
            batch_upload_datetime,
        }
    }

    pub fn batch_number(&self) -> &str {
        &self.batch_number
    }

    async fn parse(&self, file: &UploadedFile, context: &ExecutionContext) -> ParseResult {
        let mut result = ParseResult::pending(&file.filename, file.size);

        // Step 1: Extract structured data
        let mut resume = match context
            .extractor
            .extract(&file.filename, &file.bytes)
            .instrument(info_span!("extract"))
            .await
        {
            Ok(resume) => resume,
            Err(e) => {
                result.fail(&restage(e, Stage::Extraction));
                return result;
            }
        };
        let parsing_method = resume
            .parsing_method
            .clone()
            .unwrap_or_else(|| context.extractor.method().to_string());
        result.parsing_method = Some(parsing_method.clone());

        // Step 2: Mandatory identity fields
        let missing = resume.fill_missing_identity();
        let profile_status = ProfileStatus::from_missing(&missing);
        if !missing.is_empty() {
            debug!("Missing mandatory fields: {:?}", missing);
        }

        // Step 3: Classify
        let classification = match context
            .classifier
            .classify(&resume)
            .instrument(info_span!("classify"))
            .await
        {
            Ok(classification) => {
                result.classification_generated = true;
                result.classification_reasoning = Some(classification.reasoning.clone());
                Some(classification)
            }
            Err(e) => {
                let e = restage(e, Stage::Classification);
                warn!("Classification skipped: {}", e);
                result.classification_error = Some(e.to_string());
                None
            }
        };

        // Step 4: Persist candidate with children and the original file
        let metadata = json!({
            "batch_number": self.batch_number,
            "batch_upload_datetime": self.batch_upload_datetime.to_rfc3339(),
            "profile_status": profile_status,
            "missing_mandatory_fields": missing,
            "parsing_method": parsing_method,
            "original_filename": file.filename,
            "file_size": file.size,
            "processed_at": Utc::now().to_rfc3339(),
        });
        let candidate = NewCandidate {
            resume,
            classification,
            remarks: Some(format!("Created via batch upload - Batch: {}", self.batch_number)),
            metadata,
            resume_file: Some(ResumeFile {
                file_name: file.filename.clone(),
                content_type: file.content_type(),
                bytes: file.bytes.clone(),
            }),
        };

        let candidate_id = match context
            .repository
            .create_candidate(candidate)
            .instrument(info_span!("persist"))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                result.fail(&restage(e, Stage::Persistence));
                return result;
            }
        };
        result.status = ItemOutcome::Success;
        result.candidate_id = Some(candidate_id);
        result.profile_status = Some(profile_status);
        result.missing_fields = missing;

        // Step 5+6: Summarize the stored profile and write it back
        if let Err(e) = self.summarize(candidate_id, context).await {
            warn!("AI summary skipped for candidate {}: {}", candidate_id, e);
            result.ai_summary_error = Some(e.to_string());
        } else {
            result.ai_summary_generated = true;
        }

        result
    }

    async fn summarize(
        &self,
        candidate_id: i64,
        context: &ExecutionContext,
    ) -> Result<(), CollaboratorError> {
        let profile = context
            .repository
            .load_profile(candidate_id)
            .await
            .map_err(|e| restage(e, Stage::Loading))?;
        let update = generate_ai_update(context, &profile).await?;
        context
            .repository
            .update_ai_fields(candidate_id, &update)
            .await
            .map_err(|e| restage(e, Stage::Persistence))
    }
}

#[async_trait]
impl ItemProcessor for BatchParseProcessor {
    type Item = UploadedFile;

    fn item_ref(&self, item: &UploadedFile) -> String {
        item.filename.clone()
    }

    async fn process(&self, item: &UploadedFile, context: &ExecutionContext) -> ItemResult {
        let filename = sanitize::redact_filename(&item.filename);
        let span = info_span!("parse_resume", job_id = %self.job_id, filename = %filename);
        self.parse(item, context).instrument(span).await.into()
    }

    fn escaped(&self, item: &UploadedFile, error: &CollaboratorError) -> ItemResult {
        ParseResult::failure(&item.filename, item.size, error).into()
    }
}
