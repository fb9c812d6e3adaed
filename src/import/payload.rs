//! Conversion of local records into the bulk-create payload, and submission.
//!
//! Step fields that look like source code are wrapped in `{code}` markup so the
//! remote service renders them verbatim. Detection is heuristic: markdown code
//! fences, valid JSON, then JavaScript and Python syntax markers, in that order.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{CaseportError, Result};
use crate::remote::TestManagementApi;
use crate::remote::types::{BulkFields, BulkStep, BulkTestPayload, NamedValue, ProjectKey};

use super::types::LocalTestRecord;

static MARKDOWN_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+#-]*)[ \t]*\r?\n(.*?)\r?\n?```")
        .expect("fence regex should be valid")
});

static JAVASCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)(^\s*(const|let|var)\s+[A-Za-z_$][\w$]*\s*=)",
        r"|(\bfunction\s*[A-Za-z_$]?[\w$]*\s*\([^)]*\)\s*\{)",
        r"|(=>\s*\{)",
        r"|(\bconsole\.log\s*\()",
        r#"|(^\s*import\s+.+\s+from\s+['"])"#,
    ))
    .expect("javascript regex should be valid")
});

static PYTHON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)(^\s*def\s+\w+\s*\(.*\)\s*(->\s*[\w\[\], .]+)?:\s*$)",
        r"|(^\s*class\s+\w+(\(.*\))?\s*:\s*$)",
        r"|(^\s*from\s+[\w.]+\s+import\s+\S)",
        r"|(^\s*import\s+[\w.]+(\s+as\s+\w+)?\s*$)",
        r"|(\bprint\s*\()",
    ))
    .expect("python regex should be valid")
});

/// Map a markdown fence tag onto the language name the remote markup expects.
fn code_language(tag: &str) -> Option<&'static str> {
    match tag.to_ascii_lowercase().as_str() {
        "js" | "javascript" | "jsx" => Some("javascript"),
        "ts" | "typescript" | "tsx" => Some("typescript"),
        "py" | "python" => Some("python"),
        "sh" | "bash" | "shell" | "zsh" => Some("bash"),
        "json" => Some("json"),
        "java" => Some("java"),
        "sql" => Some("sql"),
        "xml" | "html" => Some("xml"),
        "yaml" | "yml" => Some("yaml"),
        "csharp" | "cs" | "c#" => Some("csharp"),
        "go" => Some("go"),
        "ruby" | "rb" => Some("ruby"),
        _ => None,
    }
}

fn wrap_code(language: Option<&str>, body: &str) -> String {
    match language {
        Some(lang) => format!("{{code:{lang}}}\n{body}\n{{code}}"),
        None => format!("{{code}}\n{body}\n{{code}}"),
    }
}

fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

/// Wrap code embedded in a step field in `{code}` markup.
///
/// Text already carrying `{code` markup and text that looks like prose are
/// returned unchanged.
pub fn format_step_field(text: &str) -> String {
    if text.trim().is_empty() || text.contains("{code") {
        return text.to_string();
    }

    if MARKDOWN_FENCE_RE.is_match(text) {
        return MARKDOWN_FENCE_RE
            .replace_all(text, |caps: &Captures| {
                let tag = caps.get(1).map_or("", |m| m.as_str());
                let body = caps.get(2).map_or("", |m| m.as_str());
                wrap_code(code_language(tag), body)
            })
            .into_owned();
    }

    let trimmed = text.trim();
    if looks_like_json(trimmed) {
        wrap_code(Some("json"), trimmed)
    } else if JAVASCRIPT_RE.is_match(text) {
        wrap_code(Some("javascript"), trimmed)
    } else if PYTHON_RE.is_match(text) {
        wrap_code(Some("python"), trimmed)
    } else {
        text.to_string()
    }
}

/// Pick the target project: the explicit key, else the first record's own.
pub fn resolve_project_key(explicit: Option<&str>, records: &[LocalTestRecord]) -> Result<String> {
    explicit
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| {
            records
                .first()
                .and_then(|r| r.project_key.as_deref())
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| {
            CaseportError::Submission(
                "no target project: pass a project key or set project_key on the record"
                    .to_string(),
            )
        })
}

/// Build the bulk-create entry for one record.
pub fn build_payload(record: &LocalTestRecord, project_key: &str) -> BulkTestPayload {
    let steps = record
        .steps
        .iter()
        .map(|step| BulkStep {
            action: format_step_field(&step.action),
            data: format_step_field(&step.data),
            result: format_step_field(&step.expected_result),
        })
        .collect();

    BulkTestPayload {
        test_type: record.test_type.clone(),
        fields: BulkFields {
            summary: record.summary.trim().to_string(),
            project: ProjectKey {
                key: project_key.to_string(),
            },
            description: record.description.clone(),
            labels: record.labels.clone(),
            priority: record
                .priority
                .as_ref()
                .filter(|p| !p.trim().is_empty())
                .map(|name| NamedValue { name: name.clone() }),
        },
        steps,
    }
}

/// Submit records for bulk creation and return the job id.
///
/// Does not wait for the job; see [`super::poller::poll`].
pub async fn submit(
    api: &dyn TestManagementApi,
    records: &[LocalTestRecord],
    project_key: Option<&str>,
) -> Result<String> {
    if records.is_empty() {
        return Err(CaseportError::Submission(
            "nothing to import: no records given".to_string(),
        ));
    }
    let project_key = resolve_project_key(project_key, records)?;
    let payload: Vec<BulkTestPayload> = records
        .iter()
        .map(|record| build_payload(record, &project_key))
        .collect();

    tracing::info!(project = %project_key, tests = payload.len(), "submitting bulk import");
    api.submit_bulk(&payload).await
}
