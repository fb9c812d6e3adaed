mod collections;
mod config;
mod import;
mod records;

pub use collections::cmd_collections;
pub use config::{cmd_config_set, cmd_config_show};
pub use import::{cmd_import, cmd_link, cmd_steps};
pub use records::cmd_records;

use owo_colors::OwoColorize;
use serde_json::Value;

use crate::cli::OutputOptions;
use crate::error::Result;
use crate::import::{LinkOutcome, ProgressStep, ReconciliationResult, StepState};

/// What a command prints: JSON for `--json`, text otherwise.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, output: OutputOptions) -> Result<()> {
        if output.json {
            println!("{}", serde_json::to_string_pretty(&self.json)?);
        } else if let Some(text) = self.text {
            println!("{text}");
        } else {
            println!("{}", serde_json::to_string_pretty(&self.json)?);
        }
        Ok(())
    }
}

fn state_marker(state: StepState) -> &'static str {
    match state {
        StepState::Pending => "[ ]",
        StepState::InProgress => "[~]",
        StepState::Completed => "[x]",
        StepState::Failed => "[!]",
    }
}

/// Format one progress step for single-line display
pub fn format_step_line(step: &ProgressStep) -> String {
    let marker = state_marker(step.state);
    let colored_marker = match step.state {
        StepState::Pending => marker.dimmed().to_string(),
        StepState::InProgress => marker.yellow().to_string(),
        StepState::Completed => marker.green().to_string(),
        StepState::Failed => marker.red().to_string(),
    };
    let detail = step
        .detail
        .as_deref()
        .map(|d| format!(" ({d})").dimmed().to_string())
        .unwrap_or_default();

    let id_padded = format!("{:14}", step.id);
    format!("{colored_marker} {} {}{detail}", id_padded.cyan(), step.label)
}

/// Per-link breakdown
pub fn format_outcomes(outcomes: &[LinkOutcome]) -> String {
    let mut text = String::new();
    for outcome in outcomes {
        if outcome.succeeded {
            text.push_str(&format!("  {} {}", "ok".green(), outcome.target_label));
        } else {
            text.push_str(&format!(
                "  {} {}: {}",
                "failed".red(),
                outcome.target_label,
                outcome.error_message.as_deref().unwrap_or("unknown error")
            ));
        }
        if let Some(warning) = &outcome.warning {
            text.push_str(&format!(" {}", format!("[{warning}]").yellow()));
        }
        text.push('\n');
    }
    text
}

/// Reconciliation summary
pub fn format_reconciliation(result: &ReconciliationResult) -> String {
    if !result.is_validated {
        return format!(
            "  {} {}\n",
            "not validated:".yellow(),
            result.error.as_deref().unwrap_or("relationships could not be read back")
        );
    }

    let mut text = String::new();
    for (kind, reconciliation) in result.kinds() {
        if reconciliation.expected.is_empty() {
            continue;
        }
        let found = reconciliation.expected.len() - reconciliation.missing.len();
        let line = format!(
            "  {}: {found}/{} linked",
            kind.noun(),
            reconciliation.expected.len()
        );
        if reconciliation.missing.is_empty() {
            text.push_str(&line);
        } else {
            text.push_str(&format!(
                "{line}, {} {}",
                "missing".red(),
                reconciliation.missing.join(", ")
            ));
        }
        text.push('\n');
    }
    if let Some(folder) = &result.folder {
        let found = folder.found_path.as_deref().unwrap_or("none");
        if folder.is_consistent {
            text.push_str(&format!("  folder: {found}\n"));
        } else {
            text.push_str(&format!(
                "  folder: expected {}, {} {found}\n",
                folder.expected_path,
                "found".red()
            ));
        }
    }
    if text.is_empty() {
        text.push_str("  nothing to verify\n");
    }
    text
}

#[cfg(test)]
pub(crate) fn strip_ansi(text: &str) -> String {
    let re = regex::Regex::new(r"\x1b\[[0-9;]*m").expect("ansi regex should be valid");
    re.replace_all(text, "").into_owned()
}
