//! Wire-level types exchanged with the remote service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CaseportError;

/// One entry of the bulk-create request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkTestPayload {
    #[serde(rename = "testtype")]
    pub test_type: String,
    pub fields: BulkFields,
    pub steps: Vec<BulkStep>,
}

/// Issue fields of a bulk-created test, scoped to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFields {
    pub summary: String,
    pub project: ProjectKey,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<NamedValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectKey {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
}

/// One manual step of a bulk-created test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStep {
    pub action: String,
    pub data: String,
    pub result: String,
}

/// What a linking mutation reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    /// Number of relationships actually created, when the mutation reports one
    pub added: Option<usize>,
    pub warnings: Vec<String>,
}

impl MutationReport {
    pub fn added(count: usize) -> Self {
        Self {
            added: Some(count),
            warnings: Vec::new(),
        }
    }

    pub fn warning(&self) -> Option<String> {
        if self.warnings.is_empty() {
            None
        } else {
            Some(self.warnings.join("; "))
        }
    }
}

/// Relationships of a test as currently stored remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueRelationships {
    pub test_plans: Vec<String>,
    pub test_executions: Vec<String>,
    pub test_sets: Vec<String>,
    pub preconditions: Vec<String>,
    pub folder_path: Option<String>,
}

/// Remote grouping entity a test can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    TestPlan,
    TestExecution,
    TestSet,
    Precondition,
}

impl CollectionKind {
    /// Human-readable name, e.g. "test plan"
    pub fn noun(&self) -> &'static str {
        match self {
            CollectionKind::TestPlan => "test plan",
            CollectionKind::TestExecution => "test execution",
            CollectionKind::TestSet => "test set",
            CollectionKind::Precondition => "precondition",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::TestPlan => write!(f, "plans"),
            CollectionKind::TestExecution => write!(f, "executions"),
            CollectionKind::TestSet => write!(f, "sets"),
            CollectionKind::Precondition => write!(f, "preconditions"),
        }
    }
}

impl FromStr for CollectionKind {
    type Err = CaseportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plan" | "plans" | "test_plan" | "test-plan" => Ok(CollectionKind::TestPlan),
            "execution" | "executions" | "exec" | "test_execution" | "test-execution" => {
                Ok(CollectionKind::TestExecution)
            }
            "set" | "sets" | "test_set" | "test-set" => Ok(CollectionKind::TestSet),
            "precondition" | "preconditions" => Ok(CollectionKind::Precondition),
            _ => Err(CaseportError::Config(format!(
                "unknown collection kind '{s}', expected plans, executions, sets or preconditions"
            ))),
        }
    }
}

/// A remote collection as listed for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub issue_id: String,
    pub key: Option<String>,
    pub summary: Option<String>,
}
