//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use std::time::Duration;

use hireflow::candidate::{CareerEntry, EducationEntry, LanguageEntry, ParsedResume};
use hireflow::config::{Config, OrchestratorConfig};
use hireflow::UploadedFile;

/// Builder for extractor output.
pub struct ResumeBuilder {
    resume: ParsedResume,
}

impl ResumeBuilder {
    /// A complete resume for `first last` with a derived email address.
    pub fn new(first: &str, last: &str) -> Self {
        Self {
            resume: ParsedResume {
                first_name: Some(first.to_string()),
                last_name: Some(last.to_string()),
                email: Some(format!(
                    "{}.{}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase()
                )),
                ..ParsedResume::default()
            },
        }
    }

    pub fn without_email(mut self) -> Self {
        self.resume.email = None;
        self
    }

    pub fn without_last_name(mut self) -> Self {
        self.resume.last_name = None;
        self
    }

    pub fn skill(mut self, skill: &str) -> Self {
        self.resume.skills.push(skill.to_string());
        self
    }

    pub fn job(mut self, title: &str, company: &str, start: &str) -> Self {
        self.resume.career_history.push(CareerEntry {
            job_title: Some(title.to_string()),
            company_name: Some(company.to_string()),
            start_date: Some(start.to_string()),
            ..CareerEntry::default()
        });
        self
    }

    pub fn school(mut self, school: &str, start: &str) -> Self {
        self.resume.education.push(EducationEntry {
            school: Some(school.to_string()),
            start_date: Some(start.to_string()),
            ..EducationEntry::default()
        });
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.resume.languages.push(LanguageEntry {
            language: language.to_string(),
            proficiency_level: None,
        });
        self
    }

    pub fn build(self) -> ParsedResume {
        self.resume
    }
}

/// An upload whose bytes spell its own name.
pub fn upload(name: &str) -> UploadedFile {
    UploadedFile::new(name, format!("%PDF-1.4 {}", name).into_bytes())
}

/// Builder for `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Defaults with no throttling, so tests run fast.
    pub fn new() -> Self {
        let mut config = Config::default();
        config.orchestrator = OrchestratorConfig::new(2, Duration::ZERO);
        Self { config }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.orchestrator.max_concurrent_workers = count;
        self
    }

    pub fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.config.orchestrator.rate_limit_delay_secs = delay.as_secs_f64();
        self
    }

    pub fn max_age_hours(mut self, hours: u64) -> Self {
        self.config.retention.max_age_hours = hours;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
