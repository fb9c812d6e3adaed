//! End-to-end import: create the test, link it, verify the links.
//!
//! Creation (submit + poll) strictly precedes linking, which strictly precedes
//! validation. A fatal error during creation ends the run with `Err` and leaves
//! the remaining steps pending. Once the issue exists every further failure is
//! reported in the [`OrchestrationResult`] instead.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{CaseportError, Result};
use crate::records::RecordSource;
use crate::remote::TestManagementApi;

use super::linker::{link_operations, plan_operations};
use super::payload::submit;
use super::poller::{PollOptions, poll};
use super::progress::{
    ProgressObserver, ProgressStep, ProgressTracker, StepState, describe_steps, link_steps,
};
use super::types::{
    LinkRequest, LinkingReport, OrchestrationResult, ReconciliationResult, RemoteIssueRef,
};
use super::validator::validate;

/// Runs imports against one remote service.
pub struct ImportOrchestrator {
    api: Arc<dyn TestManagementApi>,
    records: Arc<dyn RecordSource>,
    poll: PollOptions,
    cancel: CancellationToken,
}

impl ImportOrchestrator {
    pub fn new(api: Arc<dyn TestManagementApi>, records: Arc<dyn RecordSource>) -> Self {
        Self {
            api,
            records,
            poll: PollOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run from starting further steps.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Steps an import with `request` will go through. No I/O.
    pub fn start_import(&self, request: &LinkRequest) -> Vec<ProgressStep> {
        describe_steps(request)
    }

    /// Create the test stored as `record_id` and link it per `request`.
    pub async fn execute_import(
        &self,
        record_id: &str,
        project_key: Option<&str>,
        request: &LinkRequest,
        observer: &mut dyn ProgressObserver,
    ) -> Result<OrchestrationResult> {
        let mut tracker = ProgressTracker::new(describe_steps(request), observer);
        // The create step always comes first
        let create = 0;
        tracker.advance(create, StepState::InProgress, None);

        let issue = match self.create_issue(record_id, project_key).await {
            Ok(issue) => issue,
            Err(e) => {
                tracker.advance(create, StepState::Failed, Some(e.to_string()));
                return Err(e);
            }
        };
        tracker.advance(create, StepState::Completed, Some(issue.display_key().to_string()));
        tracing::info!(issue_id = %issue.issue_id, key = issue.display_key(), "test created");

        if self.cancel.is_cancelled() {
            tracing::warn!(
                issue_id = %issue.issue_id,
                "run cancelled after creation, links not attempted"
            );
            return Ok(OrchestrationResult {
                issue,
                link_outcomes: Vec::new(),
                reconciliation: ReconciliationResult::not_validated("cancelled before linking"),
                cancelled: true,
                has_errors: true,
            });
        }

        let report = self
            .link_and_validate(&issue.issue_id, request, &mut tracker, 1)
            .await;
        let has_errors = report.has_errors();

        Ok(OrchestrationResult {
            issue,
            link_outcomes: report.link_outcomes,
            reconciliation: report.reconciliation,
            cancelled: false,
            has_errors,
        })
    }

    /// Link an existing issue and verify the links, without creating anything.
    pub async fn execute_linking(
        &self,
        issue_id: &str,
        request: &LinkRequest,
        observer: &mut dyn ProgressObserver,
    ) -> LinkingReport {
        let planned = plan_operations(request);
        let mut tracker = ProgressTracker::new(link_steps(&planned), observer);
        self.link_and_validate(issue_id, request, &mut tracker, 0).await
    }

    async fn create_issue(
        &self,
        record_id: &str,
        project_key: Option<&str>,
    ) -> Result<RemoteIssueRef> {
        let record = self.records.load(record_id)?;
        record.validate()?;

        let job_id = submit(
            self.api.as_ref(),
            std::slice::from_ref(&record),
            project_key,
        )
        .await?;
        let created = poll(self.api.as_ref(), &job_id, self.poll, &self.cancel).await?;

        // One record was submitted, so only the first issue matters
        let (issue_id, key) = created.first().ok_or_else(|| CaseportError::JobFailed {
            job_id: job_id.clone(),
            message: "job reported no created issues".to_string(),
        })?;
        Ok(RemoteIssueRef {
            issue_id: issue_id.to_string(),
            key: key.map(str::to_string),
        })
    }

    /// Link steps start at `offset` in the tracker's list.
    async fn link_and_validate(
        &self,
        issue_id: &str,
        request: &LinkRequest,
        tracker: &mut ProgressTracker<'_>,
        offset: usize,
    ) -> LinkingReport {
        let planned = plan_operations(request);
        for index in 0..planned.len() {
            tracker.advance(offset + index, StepState::InProgress, None);
        }

        let link_outcomes = link_operations(
            self.api.as_ref(),
            issue_id,
            &planned,
            &self.cancel,
            |index, outcome| {
                let (state, detail) = if outcome.succeeded {
                    (StepState::Completed, outcome.warning.clone())
                } else {
                    (StepState::Failed, outcome.error_message.clone())
                };
                tracker.advance(offset + index, state, detail);
            },
        )
        .await;

        let reconciliation = validate(self.api.as_ref(), issue_id, request).await;
        LinkingReport {
            link_outcomes,
            reconciliation,
        }
    }
}
