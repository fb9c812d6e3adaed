//! Data model of an import run: the local record, the requested links and
//! everything a run reports back.

use serde::{Deserialize, Serialize};

use crate::error::{CaseportError, Result};
use crate::remote::CollectionKind;

pub const DEFAULT_TEST_TYPE: &str = "Manual";

/// Root folder path; linking to it is a no-op.
pub const ROOT_FOLDER: &str = "/";

/// One manual step of a test case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    pub action: String,
    #[serde(default)]
    pub data: String,
    #[serde(default, alias = "result")]
    pub expected_result: String,
}

/// A test case authored locally, ready to be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTestRecord {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<TestStep>,
    #[serde(default = "default_test_type")]
    pub test_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Project the test is created in, unless the caller names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(default, skip_serializing_if = "LinkRequest::is_empty")]
    pub links: LinkRequest,
}

fn default_test_type() -> String {
    DEFAULT_TEST_TYPE.to_string()
}

impl LocalTestRecord {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: String::new(),
            steps: Vec::new(),
            test_type: default_test_type(),
            priority: None,
            labels: Vec::new(),
            project_key: None,
            links: LinkRequest::default(),
        }
    }

    /// Reject records the remote service would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.summary.trim().is_empty() {
            return Err(CaseportError::InvalidRecord(
                "summary must not be empty".to_string(),
            ));
        }
        if let Some(index) = self.steps.iter().position(|s| s.action.trim().is_empty()) {
            return Err(CaseportError::InvalidRecord(format!(
                "step {} has no action",
                index + 1
            )));
        }
        Ok(())
    }
}

/// Relationships to create for an issue once it exists.
///
/// A folder path is only used together with a project id; without both (or
/// with the root path) no folder link is attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_plans: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_executions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_sets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
}

impl LinkRequest {
    /// Folder link target, if both path and project are known.
    pub fn folder_target(&self) -> Option<(u64, &str)> {
        let path = self.folder_path.as_deref()?.trim();
        let project_id = self.project_id?;
        if path.is_empty() || path == ROOT_FOLDER {
            return None;
        }
        Some((project_id, path))
    }

    /// True when nothing would be linked.
    pub fn is_empty(&self) -> bool {
        self.test_plans.is_empty()
            && self.test_executions.is_empty()
            && self.test_sets.is_empty()
            && self.preconditions.is_empty()
            && self.folder_target().is_none()
    }
}

/// The issue created by a bulk import job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteIssueRef {
    pub issue_id: String,
    pub key: Option<String>,
}

impl RemoteIssueRef {
    /// Key if known, otherwise the internal id.
    pub fn display_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.issue_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTargetKind {
    TestPlan,
    TestExecution,
    TestSet,
    Folder,
    Preconditions,
}

/// Result of one attempted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutcome {
    pub target_label: String,
    pub target_kind: LinkTargetKind,
    /// Collection id, folder path, or comma separated precondition ids
    pub target: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Expected versus found ids for one collection kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindReconciliation {
    pub expected: Vec<String>,
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderReconciliation {
    pub expected_path: String,
    pub found_path: Option<String>,
    pub is_consistent: bool,
}

/// What actually exists remotely after linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// False when the read-back failed; all sets are then empty
    pub is_validated: bool,
    pub test_plans: KindReconciliation,
    pub test_executions: KindReconciliation,
    pub test_sets: KindReconciliation,
    pub preconditions: KindReconciliation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderReconciliation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReconciliationResult {
    /// Validated result for a request with nothing to check.
    pub fn empty() -> Self {
        Self {
            is_validated: true,
            test_plans: KindReconciliation::default(),
            test_executions: KindReconciliation::default(),
            test_sets: KindReconciliation::default(),
            preconditions: KindReconciliation::default(),
            folder: None,
            error: None,
        }
    }

    pub fn not_validated(error: impl Into<String>) -> Self {
        Self {
            is_validated: false,
            error: Some(error.into()),
            ..Self::empty()
        }
    }

    pub fn kinds(&self) -> [(CollectionKind, &KindReconciliation); 4] {
        [
            (CollectionKind::TestPlan, &self.test_plans),
            (CollectionKind::TestExecution, &self.test_executions),
            (CollectionKind::TestSet, &self.test_sets),
            (CollectionKind::Precondition, &self.preconditions),
        ]
    }

    pub fn has_missing(&self) -> bool {
        self.kinds().iter().any(|(_, k)| !k.missing.is_empty())
    }

    pub fn folder_consistent(&self) -> bool {
        self.folder.as_ref().is_none_or(|f| f.is_consistent)
    }
}

/// Links and reconciliation of one linking pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkingReport {
    pub link_outcomes: Vec<LinkOutcome>,
    pub reconciliation: ReconciliationResult,
}

impl LinkingReport {
    pub fn has_errors(&self) -> bool {
        self.link_outcomes.iter().any(|o| !o.succeeded)
            || self.reconciliation.has_missing()
            || !self.reconciliation.folder_consistent()
    }
}

/// Terminal output of a successful (possibly partial) import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationResult {
    pub issue: RemoteIssueRef,
    pub link_outcomes: Vec<LinkOutcome>,
    pub reconciliation: ReconciliationResult,
    /// Linking was skipped because the run was cancelled after creation
    pub cancelled: bool,
    pub has_errors: bool,
}
