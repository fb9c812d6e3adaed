//! GraphQL documents and response shapes for the remote service.
//!
//! The remote schema reports "how much was added" inconsistently: some
//! mutations return a count, most return the list of added ids. [`AddedCount`]
//! accepts both so callers only ever see a number.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::{CollectionKind, CollectionSummary, IssueRelationships, MutationReport};

/// Page size used for relationship and collection reads.
pub const READ_LIMIT: u32 = 100;

pub const ADD_TESTS_TO_TEST_PLAN: &str = r#"
mutation AddTestsToTestPlan($issueId: String!, $testIssueIds: [String]!) {
  addTestsToTestPlan(issueId: $issueId, testIssueIds: $testIssueIds) {
    addedTests
    warning
  }
}"#;

pub const ADD_TESTS_TO_TEST_EXECUTION: &str = r#"
mutation AddTestsToTestExecution($issueId: String!, $testIssueIds: [String]!) {
  addTestsToTestExecution(issueId: $issueId, testIssueIds: $testIssueIds) {
    addedTests
    warning
  }
}"#;

pub const ADD_TESTS_TO_TEST_SET: &str = r#"
mutation AddTestsToTestSet($issueId: String!, $testIssueIds: [String]!) {
  addTestsToTestSet(issueId: $issueId, testIssueIds: $testIssueIds) {
    addedTests
    warning
  }
}"#;

pub const ADD_TESTS_TO_FOLDER: &str = r#"
mutation AddTestsToFolder($projectId: String!, $path: String!, $testIssueIds: [String]!) {
  addTestsToFolder(projectId: $projectId, path: $path, testIssueIds: $testIssueIds) {
    folder {
      path
    }
    warnings
  }
}"#;

pub const ADD_PRECONDITIONS_TO_TEST: &str = r#"
mutation AddPreconditionsToTest($issueId: String!, $preconditionIssueIds: [String]!) {
  addPreconditionsToTest(issueId: $issueId, preconditionIssueIds: $preconditionIssueIds) {
    addedPreconditions
    warning
  }
}"#;

pub const GET_TEST_RELATIONSHIPS: &str = r#"
query GetTestRelationships($issueId: String!, $limit: Int!) {
  getTest(issueId: $issueId) {
    issueId
    testPlans(limit: $limit) { results { issueId } }
    testExecutions(limit: $limit) { results { issueId } }
    testSets(limit: $limit) { results { issueId } }
    preconditions(limit: $limit) { results { issueId } }
    folder { path }
  }
}"#;

pub const GET_TEST_PLANS: &str = r#"
query GetTestPlans($jql: String!, $limit: Int!) {
  getTestPlans(jql: $jql, limit: $limit) {
    total
    results { issueId jira(fields: ["key", "summary"]) }
  }
}"#;

pub const GET_TEST_EXECUTIONS: &str = r#"
query GetTestExecutions($jql: String!, $limit: Int!) {
  getTestExecutions(jql: $jql, limit: $limit) {
    total
    results { issueId jira(fields: ["key", "summary"]) }
  }
}"#;

pub const GET_TEST_SETS: &str = r#"
query GetTestSets($jql: String!, $limit: Int!) {
  getTestSets(jql: $jql, limit: $limit) {
    total
    results { issueId jira(fields: ["key", "summary"]) }
  }
}"#;

pub const GET_PRECONDITIONS: &str = r#"
query GetPreconditions($jql: String!, $limit: Int!) {
  getPreconditions(jql: $jql, limit: $limit) {
    total
    results { issueId jira(fields: ["key", "summary"]) }
  }
}"#;

pub const GET_FOLDER: &str = r#"
query GetFolder($projectId: String!, $path: String!) {
  getFolder(projectId: $projectId, path: $path) {
    name
    path
    folders
  }
}"#;

/// Document and root field listing collections of `kind`.
pub fn collection_query(kind: CollectionKind) -> (&'static str, &'static str) {
    match kind {
        CollectionKind::TestPlan => (GET_TEST_PLANS, "getTestPlans"),
        CollectionKind::TestExecution => (GET_TEST_EXECUTIONS, "getTestExecutions"),
        CollectionKind::TestSet => (GET_TEST_SETS, "getTestSets"),
        CollectionKind::Precondition => (GET_PRECONDITIONS, "getPreconditions"),
    }
}

/// JQL restricting a collection listing to one project.
pub fn project_jql(project_key: &str) -> String {
    format!("project = \"{}\"", project_key.replace('"', "\\\""))
}

/// Count of relationships a mutation created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedCount(pub usize);

impl<'de> Deserialize<'de> for AddedCount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Items(Vec<Value>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Count(n) => AddedCount(n as usize),
            Raw::Items(items) => AddedCount(items.len()),
        })
    }
}

/// Result shape shared by the "add tests to X" mutations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTestsResult {
    #[serde(default)]
    pub added_tests: Option<AddedCount>,
    #[serde(default)]
    pub warning: Option<String>,
}

impl From<AddTestsResult> for MutationReport {
    fn from(result: AddTestsResult) -> Self {
        MutationReport {
            added: result.added_tests.map(|c| c.0),
            warnings: result.warning.into_iter().filter(|w| !w.is_empty()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTestsToTestPlanData {
    pub add_tests_to_test_plan: AddTestsResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTestsToTestExecutionData {
    pub add_tests_to_test_execution: AddTestsResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTestsToTestSetData {
    pub add_tests_to_test_set: AddTestsResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTestsToFolderData {
    pub add_tests_to_folder: FolderResult,
}

#[derive(Debug, Deserialize)]
pub struct FolderResult {
    #[serde(default)]
    pub folder: Option<FolderRef>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

impl From<FolderResult> for MutationReport {
    // The folder mutation reports no count; warnings are all we get
    fn from(result: FolderResult) -> Self {
        MutationReport {
            added: None,
            warnings: result.warnings.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPreconditionsToTestData {
    pub add_preconditions_to_test: AddPreconditionsResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPreconditionsResult {
    #[serde(default)]
    pub added_preconditions: Option<AddedCount>,
    #[serde(default)]
    pub warning: Option<String>,
}

impl From<AddPreconditionsResult> for MutationReport {
    fn from(result: AddPreconditionsResult) -> Self {
        MutationReport {
            added: result.added_preconditions.map(|c| c.0),
            warnings: result.warning.into_iter().filter(|w| !w.is_empty()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTestData {
    pub get_test: Option<TestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNode {
    #[serde(default)]
    pub test_plans: Option<IssueIdPage>,
    #[serde(default)]
    pub test_executions: Option<IssueIdPage>,
    #[serde(default)]
    pub test_sets: Option<IssueIdPage>,
    #[serde(default)]
    pub preconditions: Option<IssueIdPage>,
    #[serde(default)]
    pub folder: Option<FolderRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueIdPage {
    #[serde(default)]
    pub results: Vec<IssueIdNode>,
}

impl IssueIdPage {
    fn into_ids(self) -> Vec<String> {
        self.results.into_iter().map(|n| n.issue_id).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueIdNode {
    pub issue_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRef {
    #[serde(default)]
    pub path: Option<String>,
}

impl From<TestNode> for IssueRelationships {
    fn from(node: TestNode) -> Self {
        IssueRelationships {
            test_plans: node.test_plans.unwrap_or_default().into_ids(),
            test_executions: node.test_executions.unwrap_or_default().into_ids(),
            test_sets: node.test_sets.unwrap_or_default().into_ids(),
            preconditions: node.preconditions.unwrap_or_default().into_ids(),
            folder_path: node.folder.and_then(|f| f.path),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CollectionPage {
    #[serde(default)]
    pub results: Vec<CollectionNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionNode {
    pub issue_id: String,
    #[serde(default)]
    pub jira: Option<Value>,
}

impl From<CollectionNode> for CollectionSummary {
    fn from(node: CollectionNode) -> Self {
        let field = |name: &str| {
            node.jira
                .as_ref()
                .and_then(|j| j.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        CollectionSummary {
            key: field("key"),
            summary: field("summary"),
            issue_id: node.issue_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFolderData {
    pub get_folder: Option<FolderTree>,
}

#[derive(Debug, Deserialize)]
pub struct FolderTree {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub folders: Option<Value>,
}

/// Flatten a folder tree into paths, parents before children.
pub fn flatten_folder_paths(tree: &FolderTree) -> Vec<String> {
    let mut paths = Vec::new();
    if let Some(path) = &tree.path {
        paths.push(path.clone());
    }
    if let Some(children) = &tree.folders {
        collect_folder_paths(children, &mut paths);
    }
    paths
}

fn collect_folder_paths(value: &Value, paths: &mut Vec<String>) {
    let Some(children) = value.as_array() else {
        return;
    };
    for child in children {
        if let Some(path) = child.get("path").and_then(Value::as_str) {
            paths.push(path.to_string());
        }
        if let Some(grandchildren) = child.get("folders") {
            collect_folder_paths(grandchildren, paths);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_added_count_accepts_list_and_number() {
        let listed: AddTestsResult =
            serde_json::from_value(json!({"addedTests": ["1", "2"], "warning": null})).unwrap();
        assert_eq!(listed.added_tests, Some(AddedCount(2)));

        let counted: AddTestsResult =
            serde_json::from_value(json!({"addedTests": 0, "warning": "already linked"})).unwrap();
        let report = MutationReport::from(counted);
        assert_eq!(report.added, Some(0));
        assert_eq!(report.warning().as_deref(), Some("already linked"));
    }

    #[test]
    fn test_missing_added_field_is_unknown() {
        let result: AddTestsResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(MutationReport::from(result).added, None);
    }

    #[test]
    fn test_relationships_from_node() {
        let data: GetTestData = serde_json::from_value(json!({
            "getTest": {
                "issueId": "100",
                "testPlans": {"results": [{"issueId": "P1"}, {"issueId": "P2"}]},
                "testExecutions": {"results": []},
                "testSets": null,
                "preconditions": {"results": [{"issueId": "C1"}]},
                "folder": {"path": "/Root/Auth"}
            }
        }))
        .unwrap();

        let rel = IssueRelationships::from(data.get_test.unwrap());
        assert_eq!(rel.test_plans, vec!["P1", "P2"]);
        assert!(rel.test_executions.is_empty());
        assert!(rel.test_sets.is_empty());
        assert_eq!(rel.preconditions, vec!["C1"]);
        assert_eq!(rel.folder_path.as_deref(), Some("/Root/Auth"));
    }

    #[test]
    fn test_collection_summary_reads_jira_fields() {
        let node: CollectionNode = serde_json::from_value(json!({
            "issueId": "10001",
            "jira": {"key": "QA-7", "summary": "Release plan"}
        }))
        .unwrap();
        let summary = CollectionSummary::from(node);
        assert_eq!(summary.issue_id, "10001");
        assert_eq!(summary.key.as_deref(), Some("QA-7"));
        assert_eq!(summary.summary.as_deref(), Some("Release plan"));
    }

    #[test]
    fn test_flatten_folder_paths() {
        let tree: FolderTree = serde_json::from_value(json!({
            "path": "/",
            "folders": [
                {"name": "Auth", "path": "/Auth", "folders": [
                    {"name": "Login", "path": "/Auth/Login", "folders": []}
                ]},
                {"name": "Billing", "path": "/Billing"}
            ]
        }))
        .unwrap();
        assert_eq!(
            flatten_folder_paths(&tree),
            vec!["/", "/Auth", "/Auth/Login", "/Billing"]
        );
    }

    #[test]
    fn test_project_jql_escapes_quotes() {
        assert_eq!(project_jql("QA"), "project = \"QA\"");
        assert_eq!(project_jql("Q\"A"), "project = \"Q\\\"A\"");
    }
}
