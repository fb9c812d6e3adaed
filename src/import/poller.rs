//! Polling of asynchronous bulk import jobs.
//!
//! A job is read until it reports `successful` or `failed`, or until the
//! attempt budget runs out. The status envelope is not consistent across
//! remote versions: created issues appear under either `result.issues` or
//! `result.createdIssues`, and entries use `id`/`key` or `issueId`/`issueKey`.
//! [`extract_created_issues`] normalises both.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{CaseportError, Result};
use crate::remote::TestManagementApi;
use crate::remote::error::describe_error_payload;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Successful,
    Failed,
    TimedOut,
}

/// Classify a status payload. Anything not terminal counts as pending.
pub fn job_state(payload: &Value) -> JobState {
    match payload
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("successful") => JobState::Successful,
        Some("failed") => JobState::Failed,
        _ => JobState::Pending,
    }
}

/// Issues created by a successful job, in the order reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedIssues {
    pub issue_ids: Vec<String>,
    /// Keys aligned with `issue_ids`; `None` where the job omitted one
    pub issue_keys: Vec<Option<String>>,
}

impl CreatedIssues {
    pub fn is_empty(&self) -> bool {
        self.issue_ids.is_empty()
    }

    /// The first created issue, with its key if one was reported.
    pub fn first(&self) -> Option<(&str, Option<&str>)> {
        let id = self.issue_ids.first()?;
        let key = self.issue_keys.first().and_then(|k| k.as_deref());
        Some((id.as_str(), key))
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_field(entry: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| entry.get(*name).and_then(scalar_string))
}

/// Pull created issue ids and keys out of a successful status payload.
pub fn extract_created_issues(payload: &Value) -> CreatedIssues {
    let result = payload.get("result");
    let entries = result
        .and_then(|r| r.get("issues"))
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .or_else(|| {
            result
                .and_then(|r| r.get("createdIssues"))
                .and_then(Value::as_array)
        });

    let mut created = CreatedIssues::default();
    for entry in entries.into_iter().flatten() {
        let Some(id) = first_field(entry, &["id", "issueId"]) else {
            continue;
        };
        created.issue_ids.push(id);
        created
            .issue_keys
            .push(first_field(entry, &["key", "issueKey"]));
    }
    created
}

/// Most specific failure message of a failed status payload.
pub fn extract_failure_message(payload: &Value) -> String {
    payload
        .get("result")
        .and_then(describe_error_payload)
        .or_else(|| describe_error_payload(payload))
        .unwrap_or_else(|| payload.to_string())
}

/// Poll `job_id` until it finishes.
///
/// Performs at most `options.max_attempts` status reads, waiting
/// `options.interval` between them. Transport failures count as a pending
/// read. Any answer the remote refuses, such as an unknown job id or a
/// rejected token, ends polling with that error.
pub async fn poll(
    api: &dyn TestManagementApi,
    job_id: &str,
    options: PollOptions,
    cancel: &CancellationToken,
) -> Result<CreatedIssues> {
    for attempt in 1..=options.max_attempts {
        if cancel.is_cancelled() {
            return Err(CaseportError::Cancelled);
        }

        let state = match api.job_status(job_id).await {
            Ok(payload) => match job_state(&payload) {
                JobState::Successful => {
                    let created = extract_created_issues(&payload);
                    if created.is_empty() {
                        return Err(CaseportError::JobFailed {
                            job_id: job_id.to_string(),
                            message: "job succeeded but reported no created issues".to_string(),
                        });
                    }
                    tracing::debug!(%job_id, attempt, issues = ?created.issue_ids, "import job finished");
                    return Ok(created);
                }
                JobState::Failed => {
                    return Err(CaseportError::JobFailed {
                        job_id: job_id.to_string(),
                        message: extract_failure_message(&payload),
                    });
                }
                state => state,
            },
            Err(e @ CaseportError::Http(_)) => {
                tracing::warn!(%job_id, attempt, "job status read failed: {e}");
                JobState::Pending
            }
            Err(e) => return Err(e),
        };
        tracing::trace!(%job_id, attempt, ?state, "import job not finished");

        if attempt < options.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(CaseportError::Cancelled),
                _ = tokio::time::sleep(options.interval) => {}
            }
        }
    }

    tracing::debug!(%job_id, state = ?JobState::TimedOut, "polling budget exhausted");
    Err(CaseportError::JobTimeout {
        job_id: job_id.to_string(),
        attempts: options.max_attempts,
    })
}
