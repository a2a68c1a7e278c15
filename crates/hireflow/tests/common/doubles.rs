//! Scripted collaborators for driving jobs through known outcomes.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hireflow::candidate::{CandidateProfile, Classification, ParsedResume};
use hireflow::collaborators::{
    CandidateClassifier, CollaboratorResult, DocumentExtractor, ProfileSummarizer,
};
use hireflow::{CandidateId, CollaboratorError};

pub const EMBEDDING_DIM: usize = 1536;

/// Tracks how many calls are running at once.
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
    total: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub enum ExtractScript {
    Resume(ParsedResume),
    Fail(String),
    Panic(String),
}

/// Extractor answering per file name. Unscripted files yield a complete
/// resume named after the file stem.
#[derive(Default)]
pub struct ScriptedExtractor {
    scripts: Mutex<HashMap<String, ExtractScript>>,
    delay: Mutex<Duration>,
    pub in_flight: InFlight,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn script(self, filename: &str, script: ExtractScript) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(filename.to_string(), script);
        self
    }

    pub fn resume(self, filename: &str, resume: ParsedResume) -> Self {
        self.script(filename, ExtractScript::Resume(resume))
    }

    pub fn fail(self, filename: &str, message: &str) -> Self {
        self.script(filename, ExtractScript::Fail(message.to_string()))
    }

    pub fn panic_on(self, filename: &str, message: &str) -> Self {
        self.script(filename, ExtractScript::Panic(message.to_string()))
    }

    fn default_resume(filename: &str) -> ParsedResume {
        let stem = filename.split('.').next().unwrap_or(filename);
        ParsedResume {
            first_name: Some(stem.to_string()),
            last_name: Some("Tester".to_string()),
            email: Some(format!("{}@example.com", stem)),
            skills: vec!["Rust".to_string()],
            ..ParsedResume::default()
        }
    }
}

#[async_trait]
impl DocumentExtractor for ScriptedExtractor {
    fn method(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, file_name: &str, _bytes: &[u8]) -> CollaboratorResult<ParsedResume> {
        self.in_flight.enter();
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let script = self.scripts.lock().unwrap().get(file_name).cloned();
        self.in_flight.exit();

        match script {
            Some(ExtractScript::Resume(resume)) => Ok(resume),
            Some(ExtractScript::Fail(message)) => Err(CollaboratorError::extraction(message)),
            Some(ExtractScript::Panic(message)) => panic!("{}", message),
            None => Ok(Self::default_resume(file_name)),
        }
    }
}

/// Classifier that tags everyone as IT unless told to fail.
#[derive(Default)]
pub struct ScriptedClassifier {
    fail_with: Option<String>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl CandidateClassifier for ScriptedClassifier {
    async fn classify(&self, _resume: &ParsedResume) -> CollaboratorResult<Classification> {
        match &self.fail_with {
            Some(message) => Err(CollaboratorError::classification(message.clone())),
            None => Ok(Classification {
                industry: "Information Technology".to_string(),
                role_tags: vec!["Backend".to_string()],
                reasoning: "Lists programming skills".to_string(),
            }),
        }
    }
}

/// Summarizer that fails for chosen candidate ids and can be slowed down.
#[derive(Default)]
pub struct ScriptedSummarizer {
    fail_for: Mutex<HashSet<CandidateId>>,
    fail_all: bool,
    blank: bool,
    delay: Duration,
    pub in_flight: InFlight,
}

impl ScriptedSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(self, ids: &[CandidateId]) -> Self {
        self.also_fail_for(ids);
        self
    }

    /// Adds failing ids after the harness took its handle.
    pub fn also_fail_for(&self, ids: &[CandidateId]) {
        self.fail_for.lock().unwrap().extend(ids.iter().copied());
    }

    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answers every summary request with whitespace only.
    pub fn blank_summaries(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn summary_for(profile: &CandidateProfile) -> String {
        format!(
            "{} {} is a candidate with {} listed skills.",
            profile.first_name,
            profile.last_name,
            profile.skills.len()
        )
    }
}

#[async_trait]
impl ProfileSummarizer for ScriptedSummarizer {
    async fn summarize(&self, profile: &CandidateProfile) -> CollaboratorResult<String> {
        self.in_flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.exit();

        let refused = self.fail_for.lock().unwrap().contains(&profile.id);
        if self.fail_all || refused {
            return Err(CollaboratorError::summarization(format!(
                "model refused candidate {}",
                profile.id
            )));
        }
        if self.blank {
            return Ok("   ".to_string());
        }
        Ok(Self::summary_for(profile))
    }

    async fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>> {
        let seed = (text.len() % 7) as f32;
        Ok((0..EMBEDDING_DIM).map(|i| seed + i as f32 / 1000.0).collect())
    }
}

/// Shared handles so tests can inspect the doubles after a run.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<ScriptedExtractor>,
    pub classifier: Arc<ScriptedClassifier>,
    pub summarizer: Arc<ScriptedSummarizer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            extractor: Arc::new(ScriptedExtractor::new()),
            classifier: Arc::new(ScriptedClassifier::new()),
            summarizer: Arc::new(ScriptedSummarizer::new()),
        }
    }
}
