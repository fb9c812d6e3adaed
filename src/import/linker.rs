//! Linking of a created issue to its requested collections.
//!
//! All operations are planned up front in a fixed kind order (plans,
//! executions, sets, folder, preconditions), dispatched together, and folded
//! back into that order once every one of them has settled. A failing
//! operation never affects its siblings.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::remote::{MutationReport, TestManagementApi};

use super::types::{LinkOutcome, LinkRequest, LinkTargetKind};

/// One attach-operation against the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOperation {
    TestPlan(String),
    TestExecution(String),
    TestSet(String),
    Folder { project_id: u64, path: String },
    Preconditions(Vec<String>),
}

impl LinkOperation {
    pub fn kind(&self) -> LinkTargetKind {
        match self {
            LinkOperation::TestPlan(_) => LinkTargetKind::TestPlan,
            LinkOperation::TestExecution(_) => LinkTargetKind::TestExecution,
            LinkOperation::TestSet(_) => LinkTargetKind::TestSet,
            LinkOperation::Folder { .. } => LinkTargetKind::Folder,
            LinkOperation::Preconditions(_) => LinkTargetKind::Preconditions,
        }
    }

    pub fn target(&self) -> String {
        match self {
            LinkOperation::TestPlan(id)
            | LinkOperation::TestExecution(id)
            | LinkOperation::TestSet(id) => id.clone(),
            LinkOperation::Folder { path, .. } => path.clone(),
            LinkOperation::Preconditions(ids) => ids.join(", "),
        }
    }

    pub fn label(&self) -> String {
        match self {
            LinkOperation::TestPlan(id) => format!("Link to test plan {id}"),
            LinkOperation::TestExecution(id) => format!("Link to test execution {id}"),
            LinkOperation::TestSet(id) => format!("Link to test set {id}"),
            LinkOperation::Folder { path, .. } => format!("Add to folder {path}"),
            LinkOperation::Preconditions(ids) => format!("Add preconditions {}", ids.join(", ")),
        }
    }

    async fn send(&self, api: &dyn TestManagementApi, issue_id: &str) -> Result<MutationReport> {
        match self {
            LinkOperation::TestPlan(id) => api.add_test_to_plan(id, issue_id).await,
            LinkOperation::TestExecution(id) => api.add_test_to_execution(id, issue_id).await,
            LinkOperation::TestSet(id) => api.add_test_to_set(id, issue_id).await,
            LinkOperation::Folder { project_id, path } => {
                api.add_test_to_folder(*project_id, path, issue_id).await
            }
            LinkOperation::Preconditions(ids) => api.add_preconditions(issue_id, ids).await,
        }
    }
}

/// A link operation with the progress step id it reports under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub step_id: String,
    pub operation: LinkOperation,
}

/// Plan every operation `request` calls for, in kind order.
pub fn plan_operations(request: &LinkRequest) -> Vec<PlannedLink> {
    let mut planned = Vec::new();

    for (i, id) in request.test_plans.iter().enumerate() {
        planned.push(PlannedLink {
            step_id: format!("plan-{i}"),
            operation: LinkOperation::TestPlan(id.clone()),
        });
    }
    for (i, id) in request.test_executions.iter().enumerate() {
        planned.push(PlannedLink {
            step_id: format!("exec-{i}"),
            operation: LinkOperation::TestExecution(id.clone()),
        });
    }
    for (i, id) in request.test_sets.iter().enumerate() {
        planned.push(PlannedLink {
            step_id: format!("set-{i}"),
            operation: LinkOperation::TestSet(id.clone()),
        });
    }
    if let Some((project_id, path)) = request.folder_target() {
        planned.push(PlannedLink {
            step_id: "folder".to_string(),
            operation: LinkOperation::Folder {
                project_id,
                path: path.to_string(),
            },
        });
    }
    if !request.preconditions.is_empty() {
        planned.push(PlannedLink {
            step_id: "preconditions".to_string(),
            operation: LinkOperation::Preconditions(request.preconditions.clone()),
        });
    }

    planned
}

fn outcome(
    operation: &LinkOperation,
    succeeded: bool,
    error_message: Option<String>,
    warning: Option<String>,
) -> LinkOutcome {
    LinkOutcome {
        target_label: operation.label(),
        target_kind: operation.kind(),
        target: operation.target(),
        succeeded,
        error_message,
        warning,
    }
}

async fn run_operation(
    api: &dyn TestManagementApi,
    issue_id: &str,
    operation: &LinkOperation,
    cancel: &CancellationToken,
) -> LinkOutcome {
    if cancel.is_cancelled() {
        return outcome(
            operation,
            false,
            Some("cancelled before the link was sent".to_string()),
            None,
        );
    }

    match operation.send(api, issue_id).await {
        // The remote side accepts duplicates and unknown ids without linking anything
        Ok(report) if report.added == Some(0) => outcome(
            operation,
            false,
            Some("the request succeeded but nothing was linked".to_string()),
            report.warning(),
        ),
        Ok(report) => outcome(operation, true, None, report.warning()),
        Err(e) => outcome(operation, false, Some(e.to_string()), None),
    }
}

/// Run planned operations concurrently.
///
/// `on_outcome` sees each outcome as it settles, with the operation's index in
/// `planned`. The returned list is in `planned` order.
pub async fn link_operations<F>(
    api: &dyn TestManagementApi,
    issue_id: &str,
    planned: &[PlannedLink],
    cancel: &CancellationToken,
    mut on_outcome: F,
) -> Vec<LinkOutcome>
where
    F: FnMut(usize, &LinkOutcome),
{
    let mut pending: FuturesUnordered<_> = planned
        .iter()
        .enumerate()
        .map(|(index, link)| async move {
            (index, run_operation(api, issue_id, &link.operation, cancel).await)
        })
        .collect();

    let mut settled = Vec::with_capacity(planned.len());
    while let Some((index, outcome)) = pending.next().await {
        if outcome.succeeded {
            tracing::debug!(step = %planned[index].step_id, target = %outcome.target, "link succeeded");
        } else {
            tracing::warn!(
                step = %planned[index].step_id,
                target = %outcome.target,
                "link failed: {}",
                outcome.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        on_outcome(index, &outcome);
        settled.push((index, outcome));
    }

    settled.sort_by_key(|(index, _)| *index);
    settled.into_iter().map(|(_, outcome)| outcome).collect()
}

/// Link `issue_id` to everything in `request`.
pub async fn link(
    api: &dyn TestManagementApi,
    issue_id: &str,
    request: &LinkRequest,
    cancel: &CancellationToken,
) -> Vec<LinkOutcome> {
    let planned = plan_operations(request);
    link_operations(api, issue_id, &planned, cancel, |_, _| {}).await
}
