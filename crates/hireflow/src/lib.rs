pub mod broadcast;
pub mod candidate;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod error;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod processors;
pub mod sanitize;
pub mod supervisor;
pub mod worker;

pub use broadcast::{JobCounts, JobEvent, JobEventBroadcaster, JobStore};
pub use candidate::{
    AiProfileUpdate, CandidateId, CandidateProfile, Classification, NewCandidate, ParsedResume,
};
pub use collaborators::{
    CandidateClassifier, CandidateRepository, DocumentExtractor, ExecutionContext,
    ProfileSummarizer,
};
pub use config::{load_config, Config, OrchestratorConfig, RetentionConfig};
pub use db::{Database, DatabaseError};
pub use error::{
    CollaboratorError, ConfigError, HireflowError, Result, Stage, SupervisorError,
};
pub use job::{Job, JobKind, JobStatus};
pub use orchestrator::JobOrchestrator;
pub use processors::UploadedFile;
pub use supervisor::{JobRequest, JobSupervisor};
