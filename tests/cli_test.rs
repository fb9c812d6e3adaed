#[path = "common/mod.rs"]
mod common;

use common::{CaseportTest, strip_ansi};
use httpmock::prelude::*;
use serde_json::{Value, json};

const LOGIN_RECORD: &str = r#"summary: Login works
project_key: QA
labels: [auth]
steps:
  - action: Open the login page
    expected_result: Form is shown
  - action: Submit credentials
    data: '{"user": "alice"}'
    expected_result: Dashboard is shown
links:
  test_plans: [P1]
"#;

fn relationships(plans: &[&str]) -> Value {
    let results: Vec<Value> = plans.iter().map(|id| json!({ "issueId": id })).collect();
    json!({
        "data": {
            "getTest": {
                "issueId": "10100",
                "testPlans": { "results": results },
                "testExecutions": { "results": [] },
                "testSets": { "results": [] },
                "preconditions": { "results": [] },
                "folder": { "path": "/" }
            }
        }
    })
}

/// Authentication, bulk submission and a job that created QA-12.
fn mock_created_test(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/authenticate");
        then.status(200).body("\"tok-1\"");
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/import/test/bulk")
            .header("authorization", "Bearer tok-1");
        then.status(200).json_body(json!({ "jobId": "job-1" }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/import/test/bulk/job-1/status");
        then.status(200).json_body(json!({
            "status": "successful",
            "result": { "issues": [{ "id": "10100", "key": "QA-12" }] }
        }));
    });
}

// ============================================================================
// Config command tests
// ============================================================================

#[test]
fn test_config_show_empty() {
    let caseport = CaseportTest::new();

    let output = strip_ansi(&caseport.run_success(&["config", "show"]));
    assert!(output.contains("Configuration"));
    assert!(output.contains("not configured"));
    assert!(output.contains("max_attempts: 30"));
}

#[test]
fn test_config_set_masks_secret() {
    let caseport = CaseportTest::new();

    let output = strip_ansi(&caseport.run_success(&[
        "config",
        "set",
        "auth.client_secret",
        "supersecret",
    ]));
    assert!(output.contains("Set auth.client_secret to su...et"));
    assert!(!output.contains("supersecret"));

    let shown = strip_ansi(&caseport.run_success(&["config", "show"]));
    assert!(shown.contains("client_secret: su...et"));
    assert!(caseport.read_config().contains("supersecret"));
}

#[test]
fn test_config_set_poll_settings() {
    let caseport = CaseportTest::new();

    caseport.run_success(&["config", "set", "poll.max_attempts", "5"]);
    caseport.run_success(&["config", "set", "poll.interval_ms", "250"]);

    let output = caseport.run_success(&["config", "show", "--json"]);
    let json: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["poll"]["max_attempts"], 5);
    assert_eq!(json["poll"]["interval_ms"], 250);
}

#[test]
fn test_config_set_rejects_bad_values() {
    let caseport = CaseportTest::new();

    let stderr = caseport.run_failure(&["config", "set", "poll.max_attempts", "0"]);
    assert!(stderr.contains("at least 1"));

    let stderr = caseport.run_failure(&["config", "set", "base_url", "not a url"]);
    assert!(!stderr.is_empty());

    let stderr = caseport.run_failure(&["config", "set", "default.remote", "x"]);
    assert!(stderr.contains("unknown config key"));
}

// ============================================================================
// Local record tests
// ============================================================================

#[test]
fn test_records_empty() {
    let caseport = CaseportTest::new();

    let output = caseport.run_success(&["records"]);
    assert!(output.contains("No records in"));
}

#[test]
fn test_records_lists_stored_records() {
    let caseport = CaseportTest::new();
    caseport.write_record("login", LOGIN_RECORD);
    caseport.write_record("broken", "summary: [unterminated");

    let output = strip_ansi(&caseport.run_success(&["records"]));
    assert!(output.contains("login"));
    assert!(output.contains("Login works"));
    assert!(output.contains("(2 steps)"));
    assert!(output.contains("broken"));
}

#[test]
fn test_steps_uses_record_links() {
    let caseport = CaseportTest::new();
    caseport.write_record("login", LOGIN_RECORD);

    let output = strip_ansi(&caseport.run_success(&["steps", "login"]));
    let lines: Vec<&str> = output.lines().map(str::trim_end).collect();
    assert_eq!(
        lines,
        vec![
            "[ ] create         Create test",
            "[ ] plan-0         Link to test plan P1",
        ]
    );
}

#[test]
fn test_steps_flags_override_record_links() {
    let caseport = CaseportTest::new();
    caseport.write_record("login", LOGIN_RECORD);

    let output = caseport.run_success(&[
        "steps",
        "login",
        "--plan",
        "P9",
        "--folder",
        "/Smoke",
        "--folder-project",
        "10000",
        "--json",
    ]);
    let json: Value = serde_json::from_str(&output).unwrap();
    let ids: Vec<&str> = json["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["create", "plan-0", "folder"]);
    assert_eq!(json["steps"][1]["label"], "Link to test plan P9");
}

#[test]
fn test_steps_missing_record() {
    let caseport = CaseportTest::new();

    let stderr = caseport.run_failure(&["steps", "nope"]);
    assert!(stderr.contains("nope"));
}

// ============================================================================
// Import against a mock remote
// ============================================================================

#[test]
fn test_import_without_credentials_fails() {
    let caseport = CaseportTest::new();
    caseport.write_record("login", LOGIN_RECORD);

    let stderr = caseport.run_failure(&["import", "login"]);
    assert!(stderr.contains("client id not configured"));
}

#[test]
fn test_import_creates_and_links() {
    let server = MockServer::start();
    mock_created_test(&server);
    let link = server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .body_includes("addTestsToTestPlan")
            .body_includes(r#""issueId":"P1""#);
        then.status(200).json_body(json!({
            "data": { "addTestsToTestPlan": { "addedTests": ["10100"], "warning": null } }
        }));
    });
    let verify = server.mock(|when, then| {
        when.method(POST).path("/graphql").body_includes("getTest(");
        then.status(200).json_body(relationships(&["P1"]));
    });

    let caseport = CaseportTest::new();
    caseport.write_remote_config(&server.base_url());
    caseport.write_record("login", LOGIN_RECORD);

    let output = strip_ansi(&caseport.run_success(&["import", "login"]));
    assert!(output.contains("Importing login (2 steps)"));
    assert!(output.contains("[x] create"));
    assert!(output.contains("Created QA-12 (issue 10100)"));
    assert!(output.contains("ok Link to test plan P1"));
    assert!(output.contains("test plan: 1/1 linked"));
    assert!(output.trim_end().ends_with("Imported"));

    link.assert_calls(1);
    verify.assert_calls(1);
    assert!(caseport.read_config().contains("tok-1"));
}

#[test]
fn test_import_json_output() {
    let server = MockServer::start();
    mock_created_test(&server);
    server.mock(|when, then| {
        when.method(POST).path("/graphql").body_includes("addTestsToTestPlan");
        then.status(200).json_body(json!({
            "data": { "addTestsToTestPlan": { "addedTests": ["10100"], "warning": null } }
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/graphql").body_includes("getTest(");
        then.status(200).json_body(relationships(&["P1"]));
    });

    let caseport = CaseportTest::new();
    caseport.write_remote_config(&server.base_url());
    caseport.write_record("login", LOGIN_RECORD);

    let output = caseport.run_success(&["import", "login", "--json"]);
    let json: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["issue"]["issue_id"], "10100");
    assert_eq!(json["issue"]["key"], "QA-12");
    assert_eq!(json["has_errors"], false);
    assert_eq!(json["reconciliation"]["is_validated"], true);
}

#[test]
fn test_import_with_rejected_link_exits_partial() {
    let server = MockServer::start();
    mock_created_test(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .body_includes("addTestsToTestPlan")
            .body_includes(r#""issueId":"P1""#);
        then.status(200).json_body(json!({
            "data": { "addTestsToTestPlan": { "addedTests": ["10100"], "warning": null } }
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .body_includes("addTestsToTestPlan")
            .body_includes(r#""issueId":"P2""#);
        then.status(200).json_body(json!({
            "data": null,
            "errors": [{ "message": "Test Plan P2 not found" }]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/graphql").body_includes("getTest(");
        then.status(200).json_body(relationships(&["P1"]));
    });

    let caseport = CaseportTest::new();
    caseport.write_remote_config(&server.base_url());
    caseport.write_record("login", LOGIN_RECORD);

    let output = caseport.run(&["import", "login", "--plan", "P1", "--plan", "P2"]);
    assert_eq!(output.status.code(), Some(2));

    let stdout = strip_ansi(&String::from_utf8_lossy(&output.stdout));
    assert!(stdout.contains("Created QA-12"));
    assert!(stdout.contains("[!] plan-1"));
    assert!(stdout.contains("Test Plan P2 not found"));
    assert!(stdout.contains("missing P2"));
    assert!(stdout.contains("Imported with warnings"));
}

#[test]
fn test_import_job_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/authenticate");
        then.status(200).body("\"tok-1\"");
    });
    server.mock(|when, then| {
        when.method(POST).path("/import/test/bulk");
        then.status(200).json_body(json!({ "jobId": "job-9" }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/import/test/bulk/job-9/status");
        then.status(200).json_body(json!({
            "status": "failed",
            "result": { "error": "Quota exceeded" }
        }));
    });
    let link = server.mock(|when, then| {
        when.method(POST).path("/graphql");
        then.status(500);
    });

    let caseport = CaseportTest::new();
    caseport.write_remote_config(&server.base_url());
    caseport.write_record("login", LOGIN_RECORD);

    let output = caseport.run(&["import", "login"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("job-9"));
    assert!(stderr.contains("Quota exceeded"));
    link.assert_calls(0);
}

#[test]
fn test_token_is_reused_across_runs() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/authenticate");
        then.status(200).body("\"tok-1\"");
    });
    let verify = server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .header("authorization", "Bearer tok-1")
            .body_includes("getTest(");
        then.status(200).json_body(relationships(&["P1"]));
    });
    server.mock(|when, then| {
        when.method(POST).path("/graphql").body_includes("addTestsToTestPlan");
        then.status(200).json_body(json!({
            "data": { "addTestsToTestPlan": { "addedTests": 1, "warning": null } }
        }));
    });

    let caseport = CaseportTest::new();
    caseport.write_remote_config(&server.base_url());

    caseport.run_success(&["link", "10100", "--plan", "P1"]);
    let output = strip_ansi(&caseport.run_success(&["link", "10100", "--plan", "P1"]));
    assert!(output.trim_end().ends_with("Linked"));

    auth.assert_calls(1);
    verify.assert_calls(2);
}

// ============================================================================
// Browsing
// ============================================================================

#[test]
fn test_collections_lists_plans() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/authenticate");
        then.status(200).body("\"tok-1\"");
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .body_includes("getTestPlans")
            .body_includes(r#"project = \"QA\""#);
        then.status(200).json_body(json!({
            "data": {
                "getTestPlans": {
                    "total": 1,
                    "results": [
                        { "issueId": "200", "jira": { "key": "QA-1", "summary": "Release 1" } }
                    ]
                }
            }
        }));
    });

    let caseport = CaseportTest::new();
    caseport.write_remote_config(&server.base_url());

    let output = strip_ansi(&caseport.run_success(&["collections", "plans", "--project", "QA"]));
    assert!(output.contains("QA-1"));
    assert!(output.contains("200"));
    assert!(output.contains("Release 1"));
}

#[test]
fn test_collections_lists_folders() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/authenticate");
        then.status(200).body("\"tok-1\"");
    });
    server.mock(|when, then| {
        when.method(POST).path("/graphql").body_includes("getFolder(");
        then.status(200).json_body(json!({
            "data": {
                "getFolder": {
                    "name": "",
                    "path": "/",
                    "folders": [
                        { "name": "Smoke", "path": "/Smoke", "folders": [
                            { "name": "Auth", "path": "/Smoke/Auth", "folders": [] }
                        ] }
                    ]
                }
            }
        }));
    });

    let caseport = CaseportTest::new();
    caseport.write_remote_config(&server.base_url());

    let output = caseport.run_success(&["collections", "folders", "--project-id", "10000"]);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["/", "/Smoke", "/Smoke/Auth"]);
}

#[test]
fn test_collections_requires_project() {
    let caseport = CaseportTest::new();
    caseport.write_config("auth:\n  client_id: a\n  client_secret: b\n");

    let stderr = caseport.run_failure(&["collections", "folders"]);
    assert!(stderr.contains("--project-id"));

    let stderr = caseport.run_failure(&["collections", "sets"]);
    assert!(stderr.contains("--project"));

    let stderr = caseport.run_failure(&["collections", "bugs", "--project", "QA"]);
    assert!(stderr.contains("unknown collection kind"));
}
