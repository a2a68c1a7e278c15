use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HireflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: String, value: String },
}

/// Errors surfaced synchronously by the supervisor facade.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("A {0} job needs at least one item")]
    EmptyBatch(crate::job::JobKind),

    #[error("Failed to spawn job thread: {0}")]
    SpawnFailed(String),
}

/// The external call an item was making when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Classification,
    Persistence,
    Loading,
    Summarization,
    Embedding,
    Worker,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extraction => write!(f, "extraction"),
            Stage::Classification => write!(f, "classification"),
            Stage::Persistence => write!(f, "persistence"),
            Stage::Loading => write!(f, "loading"),
            Stage::Summarization => write!(f, "summarization"),
            Stage::Embedding => write!(f, "embedding"),
            Stage::Worker => write!(f, "worker"),
        }
    }
}

/// A failed call to one of the external collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} failed: {message}")]
pub struct CollaboratorError {
    pub stage: Stage,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(Stage::Extraction, message)
    }

    pub fn classification(message: impl Into<String>) -> Self {
        Self::new(Stage::Classification, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(Stage::Persistence, message)
    }

    pub fn summarization(message: impl Into<String>) -> Self {
        Self::new(Stage::Summarization, message)
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::new(Stage::Embedding, message)
    }
}

impl From<crate::db::DatabaseError> for CollaboratorError {
    fn from(e: crate::db::DatabaseError) -> Self {
        Self::persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HireflowError>;
