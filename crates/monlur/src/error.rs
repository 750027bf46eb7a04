use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::JobStatus;

#[derive(Error, Debug)]
pub enum MonlurError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
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

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid environment override '{name}': {reason}")]
    InvalidOverride { name: String, reason: String },
}

/// Failure of a single obfuscation job.
///
/// Every variant maps onto one [`ErrorKind`]; the kind plus the display text
/// is what crosses the service boundary.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Source code cannot be empty")]
    EmptyInput,

    #[error("Workspace storage unavailable at '{path}': {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O fault on '{path}': {source}")]
    IoFault {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform engine '{program}' could not be launched: {source}")]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform engine failed ({status}): {diagnostics}")]
    EngineExecutionFailed { status: String, diagnostics: String },

    #[error("Transform engine timed out after {}s", .0.as_secs_f64())]
    EngineTimeout(Duration),

    #[error("Expected artifact '{0}' was not produced")]
    ArtifactMissing(PathBuf),

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Stable, serializable classification of a [`JobError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    EmptyInput,
    StorageUnavailable,
    IOFault,
    EngineUnavailable,
    EngineExecutionFailed,
    EngineTimeout,
    ArtifactMissing,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::EmptyInput => "EmptyInput",
            ErrorKind::StorageUnavailable => "StorageUnavailable",
            ErrorKind::IOFault => "IOFault",
            ErrorKind::EngineUnavailable => "EngineUnavailable",
            ErrorKind::EngineExecutionFailed => "EngineExecutionFailed",
            ErrorKind::EngineTimeout => "EngineTimeout",
            ErrorKind::ArtifactMissing => "ArtifactMissing",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::EmptyInput => ErrorKind::EmptyInput,
            JobError::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            JobError::IoFault { .. } => ErrorKind::IOFault,
            JobError::EngineUnavailable { .. } => ErrorKind::EngineUnavailable,
            JobError::EngineExecutionFailed { .. } => ErrorKind::EngineExecutionFailed,
            JobError::EngineTimeout(_) => ErrorKind::EngineTimeout,
            JobError::ArtifactMissing(_) => ErrorKind::ArtifactMissing,
            JobError::InvalidTransition { .. } => ErrorKind::Internal,
        }
    }

    /// Classifies a filesystem error into storage exhaustion vs. a generic fault.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let path = path.into();
        match source.kind() {
            Io::StorageFull
            | Io::QuotaExceeded
            | Io::PermissionDenied
            | Io::ReadOnlyFilesystem
            | Io::NotFound => JobError::StorageUnavailable { path, source },
            _ => JobError::IoFault { path, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, MonlurError>;
