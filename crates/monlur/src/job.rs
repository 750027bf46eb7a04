use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, JobError};
use crate::preset::Preset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Output text plus metrics of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub code: String,
    pub processing_time_ms: u64,
    /// Byte length of the submitted source.
    pub original_size: usize,
    /// Byte length of `code`, header included.
    pub obfuscated_size: usize,
}

/// Failure detail recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&JobError> for JobFailure {
    fn from(err: &JobError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One obfuscation request, owned by the pipeline for its whole lifetime.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source: String,
    pub preset: Preset,
    pub created_at: DateTime<Utc>,
    status: JobStatus,
    result: Option<TransformResult>,
    failure: Option<JobFailure>,
}

impl Job {
    pub fn new(source: impl Into<String>, preset: Preset) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            preset,
            created_at: Utc::now(),
            status: JobStatus::Pending,
            result: None,
            failure: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<&TransformResult> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Running)
    }

    pub fn succeed(&mut self, result: TransformResult) -> Result<(), JobError> {
        self.transition(JobStatus::Succeeded)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, error: &JobError) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.failure = Some(JobFailure::from(error));
        Ok(())
    }

    /// Consumes a terminal job into the caller-facing result.
    pub fn into_outcome(self) -> Result<TransformResult, JobFailure> {
        match (self.result, self.failure) {
            (Some(result), _) => Ok(result),
            (None, Some(failure)) => Err(failure),
            (None, None) => Err(JobFailure {
                kind: ErrorKind::Internal,
                message: format!("job {} ended in non-terminal state {}", self.id, self.status),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> TransformResult {
        TransformResult {
            code: "x".to_string(),
            processing_time_ms: 1,
            original_size: 1,
            obfuscated_size: 1,
        }
    }

    #[test]
    fn test_job_new() {
        let job = Job::new("print(1)", Preset::Weak);
        assert!(!job.id.is_empty());
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.result().is_none());
        assert!(job.failure().is_none());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = Job::new("a", Preset::Weak);
        let b = Job::new("a", Preset::Weak);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = Job::new("print(1)", Preset::Medium);
        job.start().unwrap();
        assert_eq!(job.status(), JobStatus::Running);
        job.succeed(sample_result()).unwrap();
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert!(job.status().is_terminal());
        assert_eq!(job.into_outcome().unwrap().code, "x");
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = Job::new("print(1)", Preset::Medium);
        job.start().unwrap();
        job.fail(&JobError::EmptyInput).unwrap();

        let err = job.succeed(sample_result()).unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidTransition {
                from: JobStatus::Failed,
                to: JobStatus::Succeeded
            }
        ));
        assert!(job.start().is_err());
    }

    #[test]
    fn test_cannot_succeed_without_running() {
        let mut job = Job::new("print(1)", Preset::Medium);
        assert!(job.succeed(sample_result()).is_err());
    }

    #[test]
    fn test_failure_outcome_carries_kind() {
        let mut job = Job::new("  ", Preset::Medium);
        job.fail(&JobError::EmptyInput).unwrap();
        let failure = job.into_outcome().unwrap_err();
        assert_eq!(failure.kind, ErrorKind::EmptyInput);
        assert_eq!(failure.message, "Source code cannot be empty");
    }
}
