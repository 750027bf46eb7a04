//! Phase reporting for running jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::JobStatus;

/// Phase of job processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Allocating,
    Staging,
    Transforming,
    Collecting,
    Completed,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Allocating => write!(f, "Allocating workspace"),
            JobPhase::Staging => write!(f, "Staging input"),
            JobPhase::Transforming => write!(f, "Transforming"),
            JobPhase::Collecting => write!(f, "Collecting output"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Events emitted by the pipeline during processing.
/// Source and output text are never part of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Phase {
        phase: JobPhase,
        message: String,
    },
    Completed {
        processing_time_ms: u64,
        original_size: usize,
        obfuscated_size: usize,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Reporter that drops every event.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress event for one job as published on the broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    pub phase: JobPhase,
    pub status: JobStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfuscated_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    pub fn new(job_id: &str, phase: JobPhase, message: &str) -> Self {
        let status = match phase {
            JobPhase::Queued => JobStatus::Pending,
            JobPhase::Completed => JobStatus::Succeeded,
            JobPhase::Failed => JobStatus::Failed,
            _ => JobStatus::Running,
        };

        Self {
            job_id: job_id.to_string(),
            phase,
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            processing_time_ms: None,
            original_size: None,
            obfuscated_size: None,
            error: None,
        }
    }

    fn from_event(job_id: &str, event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::Phase { phase, message } => Self::new(job_id, phase, &message),
            ProgressEvent::Completed {
                processing_time_ms,
                original_size,
                obfuscated_size,
            } => Self {
                processing_time_ms: Some(processing_time_ms),
                original_size: Some(original_size),
                obfuscated_size: Some(obfuscated_size),
                ..Self::new(job_id, JobPhase::Completed, "Obfuscation completed")
            },
            ProgressEvent::Failed { error } => Self {
                error: Some(error.clone()),
                ..Self::new(job_id, JobPhase::Failed, &error)
            },
        }
    }
}

/// Forwards pipeline events for one job onto a broadcast channel.
pub struct BroadcastProgress {
    job_id: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl BroadcastProgress {
    pub fn new(job_id: &str, sender: Arc<broadcast::Sender<JobProgressEvent>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            sender,
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        // No subscribers is not an error.
        let _ = self
            .sender
            .send(JobProgressEvent::from_event(&self.job_id, event));
    }
}
