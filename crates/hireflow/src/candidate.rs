//! Candidate data exchanged between the item processors and collaborators.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type CandidateId = i64;

/// Structured candidate fields produced by the document extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResume {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub chinese_name: Option<String>,
    pub location: Option<String>,
    pub phone_number: Option<String>,
    pub personal_summary: Option<String>,
    pub availability_weeks: Option<i64>,
    pub preferred_work_types: Option<String>,
    #[serde(default)]
    pub right_to_work: bool,
    pub salary_expectation: Option<f64>,
    pub citizenship: Option<String>,
    #[serde(default)]
    pub career_history: Vec<CareerEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub certifications: Vec<CertificationEntry>,
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
    /// Name of the extraction backend that produced these fields.
    pub parsing_method: Option<String>,
}

/// Dates are kept as the extractor returned them; see [`parse_flexible_date`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerEntry {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub grade: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificationEntry {
    pub name: Option<String>,
    pub issuing_organisation: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub language: String,
    pub proficiency_level: Option<String>,
}

/// Identity fields a candidate record must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MandatoryField {
    FirstName,
    LastName,
    Email,
}

impl fmt::Display for MandatoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MandatoryField::FirstName => write!(f, "first_name"),
            MandatoryField::LastName => write!(f, "last_name"),
            MandatoryField::Email => write!(f, "email"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Every mandatory field was present.
    Completed,
    /// Created with empty placeholders for missing mandatory fields.
    Incomplete,
}

impl ParsedResume {
    /// Replaces missing or blank mandatory fields with an empty marker and
    /// returns which ones were missing.
    pub fn fill_missing_identity(&mut self) -> Vec<MandatoryField> {
        let mut missing = Vec::new();
        for (field, slot) in [
            (MandatoryField::FirstName, &mut self.first_name),
            (MandatoryField::LastName, &mut self.last_name),
            (MandatoryField::Email, &mut self.email),
        ] {
            let blank = slot.as_deref().map(|v| v.trim().is_empty()).unwrap_or(true);
            if blank {
                *slot = Some(String::new());
                missing.push(field);
            }
        }
        missing
    }

    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{} {}", first, last).trim().to_string()
    }
}

impl ProfileStatus {
    pub fn from_missing(missing: &[MandatoryField]) -> Self {
        if missing.is_empty() {
            ProfileStatus::Completed
        } else {
            ProfileStatus::Incomplete
        }
    }
}

/// Industry and role classification returned by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub industry: String,
    #[serde(default)]
    pub role_tags: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl Classification {
    /// Role tags in the single-column form the profile table stores.
    pub fn role_tags_joined(&self) -> Option<String> {
        if self.role_tags.is_empty() {
            None
        } else {
            Some(self.role_tags.join(", "))
        }
    }
}

/// Original upload kept alongside the candidate.
#[derive(Clone, PartialEq)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ResumeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Everything persisted for one parsed resume, written in one transaction.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub resume: ParsedResume,
    pub classification: Option<Classification>,
    pub remarks: Option<String>,
    pub metadata: serde_json::Value,
    pub resume_file: Option<ResumeFile>,
}

/// A stored candidate with its active child records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: CandidateId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub chinese_name: Option<String>,
    pub location: Option<String>,
    pub phone_number: Option<String>,
    pub personal_summary: Option<String>,
    pub availability_weeks: Option<i64>,
    pub preferred_work_types: Option<String>,
    pub right_to_work: bool,
    pub salary_expectation: Option<f64>,
    pub citizenship: Option<String>,
    pub classification_of_interest: Option<String>,
    pub sub_classification_of_interest: Option<String>,
    pub ai_short_summary: Option<String>,
    pub embedding_vector: Option<Vec<f32>>,
    pub career_history: Vec<StoredCareer>,
    pub skills: Vec<String>,
    pub education: Vec<StoredEducation>,
    pub certifications: Vec<StoredCertification>,
    pub languages: Vec<LanguageEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCareer {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredEducation {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub grade: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCertification {
    pub name: Option<String>,
    pub issuing_organisation: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// AI-derived fields written back to a profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiProfileUpdate {
    pub summary: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl AiProfileUpdate {
    /// True when neither field carries anything worth persisting.
    pub fn is_empty(&self) -> bool {
        let no_summary = self
            .summary
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true);
        let no_embedding = self.embedding.as_ref().map(Vec::is_empty).unwrap_or(true);
        no_summary && no_embedding
    }
}

/// Parses the loosely formatted dates resume extractors return.
///
/// Accepts `2021-03-15`, `2021-03`, `2021`, `03/15/2021`, `15/03/2021`,
/// `March 2021` and `Mar 2021`. Anything else yields `None`.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Some(date);
    }

    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return s
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }

    // %B also accepts the abbreviated month name when parsing.
    NaiveDate::parse_from_str(&format!("1 {}", s), "%d %B %Y").ok()
}
