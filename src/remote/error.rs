//! Shared error handling for remote calls.
//!
//! Every endpoint of the remote service reports failures slightly differently.
//! [`ApiError`] captures the HTTP status and the most specific message found in
//! the response body, and maps it onto the crate error taxonomy depending on
//! which endpoint produced it.

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::CaseportError;

/// Which remote endpoint produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Authenticate,
    BulkImport,
    JobStatus,
    GraphQl,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Authenticate => write!(f, "authenticate"),
            Endpoint::BulkImport => write!(f, "bulk import"),
            Endpoint::JobStatus => write!(f, "job status"),
            Endpoint::GraphQl => write!(f, "graphql"),
        }
    }
}

/// HTTP-level failure from the remote service.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code, if available
    pub status: Option<StatusCode>,
    /// Human-readable error message
    pub message: String,
    pub endpoint: Endpoint,
}

impl ApiError {
    pub fn new(message: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            status: None,
            message: message.into(),
            endpoint,
        }
    }

    /// Build from a non-success response body.
    pub fn from_response(status: StatusCode, body: &str, endpoint: Endpoint) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| describe_error_payload(&value))
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("no response body")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            });

        Self {
            status: Some(status),
            message,
            endpoint,
        }
    }

    /// Whether the remote service rejected our credentials or token.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self.status,
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    /// Convert to the crate error, following the endpoint's failure class.
    pub fn to_caseport_error(&self) -> CaseportError {
        match self.endpoint {
            Endpoint::Authenticate if self.is_auth_rejection() => {
                CaseportError::Authentication(self.message.clone())
            }
            Endpoint::BulkImport if !self.is_auth_rejection() => {
                CaseportError::Submission(self.to_string())
            }
            _ if self.is_auth_rejection() => CaseportError::Authentication(self.to_string()),
            _ => CaseportError::Api(self.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} request failed ({}): {}",
                self.endpoint,
                status.as_u16(),
                self.message
            ),
            None => write!(f, "{} request failed: {}", self.endpoint, self.message),
        }
    }
}

impl From<ApiError> for CaseportError {
    fn from(error: ApiError) -> Self {
        error.to_caseport_error()
    }
}

/// Pick the most specific message out of an error payload.
///
/// Tries an explicit `error` field, then `message`, then the joined `errors`
/// array. Returns `None` when the payload carries none of them.
pub fn describe_error_payload(payload: &Value) -> Option<String> {
    if let Some(error) = payload.get("error").and_then(describe_error_value) {
        return Some(error);
    }
    if let Some(message) = payload.get("message").and_then(describe_error_value) {
        return Some(message);
    }
    let errors = payload.get("errors")?.as_array()?;
    let joined: Vec<String> = errors.iter().filter_map(describe_error_value).collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join("; "))
    }
}

fn describe_error_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}
