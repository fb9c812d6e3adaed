//! Post-link reconciliation.
//!
//! Mutation responses are not trusted: the remote service may report success
//! while silently dropping a duplicate or invalid reference. After linking,
//! the issue's relationships are read back once and diffed against the request.

use crate::remote::{IssueRelationships, TestManagementApi};

use super::types::{FolderReconciliation, KindReconciliation, LinkRequest, ReconciliationResult};

fn reconcile_kind(expected: &[String], found: &[String]) -> KindReconciliation {
    let missing = expected
        .iter()
        .filter(|id| !found.contains(id))
        .cloned()
        .collect();
    KindReconciliation {
        expected: expected.to_vec(),
        found: found.to_vec(),
        missing,
    }
}

/// Diff requested links against the relationships found remotely.
///
/// The folder matches when the found path contains the requested one, since
/// the remote side may return a qualified path.
pub fn reconcile(request: &LinkRequest, found: &IssueRelationships) -> ReconciliationResult {
    let folder = request.folder_target().map(|(_, expected_path)| {
        let found_path = found.folder_path.clone();
        let is_consistent = found_path
            .as_deref()
            .is_some_and(|path| path.contains(expected_path));
        FolderReconciliation {
            expected_path: expected_path.to_string(),
            found_path,
            is_consistent,
        }
    });

    ReconciliationResult {
        is_validated: true,
        test_plans: reconcile_kind(&request.test_plans, &found.test_plans),
        test_executions: reconcile_kind(&request.test_executions, &found.test_executions),
        test_sets: reconcile_kind(&request.test_sets, &found.test_sets),
        preconditions: reconcile_kind(&request.preconditions, &found.preconditions),
        folder,
        error: None,
    }
}

/// Read the issue's relationships and reconcile them with `request`.
///
/// Never fails: a failed read yields a result with `is_validated == false`.
pub async fn validate(
    api: &dyn TestManagementApi,
    issue_id: &str,
    request: &LinkRequest,
) -> ReconciliationResult {
    if request.is_empty() {
        return ReconciliationResult::empty();
    }

    match api.fetch_relationships(issue_id).await {
        Ok(found) => {
            let result = reconcile(request, &found);
            if result.has_missing() || !result.folder_consistent() {
                tracing::warn!(%issue_id, "remote relationships differ from the request");
            }
            result
        }
        Err(e) => {
            tracing::warn!(%issue_id, "could not read back relationships: {e}");
            ReconciliationResult::not_validated(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::test_support::FakeApi;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_missing_is_expected_minus_found_in_request_order() {
        let request = LinkRequest {
            test_plans: ids(&["P3", "P1", "P2"]),
            ..Default::default()
        };
        let found = IssueRelationships {
            test_plans: ids(&["P1", "P9"]),
            ..Default::default()
        };

        let result = reconcile(&request, &found);
        assert_eq!(result.test_plans.missing, ids(&["P3", "P2"]));
        assert_eq!(result.test_plans.found, ids(&["P1", "P9"]));
        assert!(result.has_missing());
    }

    #[test]
    fn test_folder_containment() {
        let request = LinkRequest {
            folder_path: Some("/Auth".to_string()),
            project_id: Some(1),
            ..Default::default()
        };
        let qualified = IssueRelationships {
            folder_path: Some("/Regression/Auth".to_string()),
            ..Default::default()
        };
        assert!(reconcile(&request, &qualified).folder_consistent());

        let elsewhere = IssueRelationships {
            folder_path: Some("/Billing".to_string()),
            ..Default::default()
        };
        let result = reconcile(&request, &elsewhere);
        assert!(!result.folder_consistent());
        assert_eq!(result.folder.unwrap().found_path.as_deref(), Some("/Billing"));

        let unfiled = reconcile(&request, &IssueRelationships::default());
        assert!(!unfiled.folder_consistent());
    }

    #[tokio::test]
    async fn test_empty_request_skips_read() {
        let api = FakeApi::new();
        let result = validate(&api, "100", &LinkRequest::default()).await;
        assert_eq!(result, ReconciliationResult::empty());
        assert_eq!(api.relationship_reads(), 0);
    }

    #[tokio::test]
    async fn test_failed_read_is_not_validated() {
        let api = FakeApi::new().with_relationships_error("read timed out");
        let request = LinkRequest {
            test_sets: ids(&["S1"]),
            ..Default::default()
        };

        let result = validate(&api, "100", &request).await;

        assert!(!result.is_validated);
        assert!(result.test_sets.expected.is_empty());
        assert!(result.test_sets.missing.is_empty());
        assert!(result.error.unwrap().contains("read timed out"));
    }
}
