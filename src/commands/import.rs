//! Import and link commands.
//!
//! - `steps`: Show the steps an import would perform
//! - `import`: Create a test from a local record and link it
//! - `link`: Link an existing remote test

use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{CommandOutput, format_outcomes, format_reconciliation, format_step_line};
use crate::cli::{LinkArgs, OutputOptions};
use crate::config::Config;
use crate::error::Result;
use crate::import::progress::describe_steps;
use crate::import::{ImportOrchestrator, LinkRequest, ProgressStep, StepState};
use crate::records::{RecordSource, RecordStore};
use crate::remote::RemoteClient;

/// Cancel `token` on Ctrl-C. Abort the returned handle once the run is over.
fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                "Cancelling: requests in flight will finish, nothing new is started".yellow()
            );
            token.cancel();
        }
    })
}

/// Print step transitions as they happen, unless output is JSON.
fn live_progress(output: OutputOptions) -> impl FnMut(usize, &ProgressStep) + Send {
    move |_, step: &ProgressStep| {
        if !output.json && step.state != StepState::InProgress {
            println!("{}", format_step_line(step));
        }
    }
}

fn orchestrator(config: &Config, store: RecordStore) -> Result<ImportOrchestrator> {
    let client = RemoteClient::from_config(config)?;
    Ok(ImportOrchestrator::new(Arc::new(client), Arc::new(store))
        .with_poll_options(config.poll_options()))
}

/// Show the steps an import of `record_id` would perform
pub fn cmd_steps(record_id: &str, links: &LinkArgs, output: OutputOptions) -> Result<()> {
    let store = RecordStore::open_default();
    let record = store.load(record_id)?;
    let request = links.apply_to(record.links);
    let steps = describe_steps(&request);

    let text = steps
        .iter()
        .map(format_step_line)
        .collect::<Vec<_>>()
        .join("\n");

    CommandOutput::new(json!({ "record": record_id, "steps": steps }))
        .with_text(text)
        .print(output)
}

/// Create a test from `record_id` and link it.
///
/// Returns `false` when the test was created but something after creation
/// went wrong.
pub async fn cmd_import(
    record_id: &str,
    project: Option<&str>,
    links: &LinkArgs,
    output: OutputOptions,
) -> Result<bool> {
    let config = Config::load()?;
    let store = RecordStore::open_default();
    let record = store.load(record_id)?;
    let request = links.apply_to(record.links);

    let orchestrator = orchestrator(&config, store)?;
    let steps = orchestrator.start_import(&request);
    if !output.json {
        println!(
            "Importing {} ({} steps)",
            record_id.cyan(),
            steps.len()
        );
    }

    let ctrl_c = cancel_on_ctrl_c(orchestrator.cancellation_token());
    let mut observer = live_progress(output);
    let result = orchestrator
        .execute_import(record_id, project, &request, &mut observer)
        .await;
    ctrl_c.abort();
    let result = result?;

    let mut text = String::new();
    text.push('\n');
    text.push_str(&format!(
        "Created {} (issue {})\n",
        result.issue.display_key().cyan().bold(),
        result.issue.issue_id
    ));
    if result.cancelled {
        text.push_str(&format!("{}\n", "Cancelled before linking".yellow()));
    } else {
        if !result.link_outcomes.is_empty() {
            text.push_str("Links:\n");
            text.push_str(&format_outcomes(&result.link_outcomes));
        }
        text.push_str("Verification:\n");
        text.push_str(&format_reconciliation(&result.reconciliation));
    }
    if result.has_errors {
        text.push_str(&format!("{}", "Imported with warnings".yellow().bold()));
    } else {
        text.push_str(&format!("{}", "Imported".green().bold()));
    }

    CommandOutput::new(serde_json::to_value(&result)?)
        .with_text(text)
        .print(output)?;
    Ok(!result.has_errors)
}

/// Link an existing remote test and verify the links.
///
/// Returns `false` when any link failed or could not be verified.
pub async fn cmd_link(issue_id: &str, links: &LinkArgs, output: OutputOptions) -> Result<bool> {
    let config = Config::load()?;
    let request = links.apply_to(LinkRequest::default());
    let orchestrator = orchestrator(&config, RecordStore::open_default())?;

    let ctrl_c = cancel_on_ctrl_c(orchestrator.cancellation_token());
    let mut observer = live_progress(output);
    let report = orchestrator
        .execute_linking(issue_id, &request, &mut observer)
        .await;
    ctrl_c.abort();

    let has_errors = report.has_errors();
    let mut text = String::new();
    if !report.link_outcomes.is_empty() {
        text.push_str("Links:\n");
        text.push_str(&format_outcomes(&report.link_outcomes));
    }
    text.push_str("Verification:\n");
    text.push_str(&format_reconciliation(&report.reconciliation));
    if has_errors {
        text.push_str(&format!("{}", "Linked with warnings".yellow().bold()));
    } else {
        text.push_str(&format!("{}", "Linked".green().bold()));
    }

    CommandOutput::new(json!({
        "issue_id": issue_id,
        "link_outcomes": report.link_outcomes,
        "reconciliation": report.reconciliation,
        "has_errors": has_errors,
    }))
    .with_text(text)
    .print(output)?;
    Ok(!has_errors)
}
