//! Caller-facing request and response shapes.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, JobError};
use crate::job::{JobFailure, TransformResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObfuscateRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

impl ObfuscateRequest {
    pub fn new(code: impl Into<String>, preset: Option<&str>) -> Self {
        Self {
            code: code.into(),
            preset: preset.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<JobFailure> for ErrorBody {
    fn from(failure: JobFailure) -> Self {
        Self {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

impl From<&JobError> for ErrorBody {
    fn from(err: &JobError) -> Self {
        JobFailure::from(err).into()
    }
}

/// `{success: true, code, ...metrics}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObfuscateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: Option<TransformResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ObfuscateResponse {
    pub fn success(result: TransformResult) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: ErrorBody) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl From<Result<TransformResult, JobError>> for ObfuscateResponse {
    fn from(outcome: Result<TransformResult, JobError>) -> Self {
        match outcome {
            Ok(result) => ObfuscateResponse::success(result),
            Err(err) => ObfuscateResponse::failure(ErrorBody::from(&err)),
        }
    }
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_response_shape() {
        let response = ObfuscateResponse::success(TransformResult {
            code: "-- header\n\nx".to_string(),
            processing_time_ms: 5,
            original_size: 1,
            obfuscated_size: 13,
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": true,
                "code": "-- header\n\nx",
                "processingTimeMs": 5,
                "originalSize": 1,
                "obfuscatedSize": 13
            })
        );
    }

    #[test]
    fn test_failure_response_shape() {
        let response: ObfuscateResponse = Err(JobError::EmptyInput).into();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"]["kind"], json!("EmptyInput"));
        assert!(value.get("code").is_none());
        assert!(!response.is_success());
    }

    #[test]
    fn test_response_deserializes_by_success_flag() {
        let failure: ObfuscateResponse = serde_json::from_value(json!({
            "success": false,
            "error": {"kind": "EngineTimeout", "message": "timed out"}
        }))
        .unwrap();
        assert!(!failure.success);
        assert!(failure.result.is_none());
        assert_eq!(failure.error.unwrap().kind, ErrorKind::EngineTimeout);
    }

    #[test]
    fn test_request_preset_is_optional() {
        let request: ObfuscateRequest = serde_json::from_str(r#"{"code": "print(1)"}"#).unwrap();
        assert_eq!(request.preset, None);
    }

    #[test]
    fn test_health_status() {
        let health = HealthStatus::ok();
        assert_eq!(health.status, "ok");
        assert!(health.timestamp > 0);
    }
}
