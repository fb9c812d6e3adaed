use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::error::Result;
use crate::records::{RecordSource, RecordStore};

/// List locally stored records
pub fn cmd_records(output: OutputOptions) -> Result<()> {
    let store = RecordStore::open_default();
    let ids = store.list()?;

    let mut entries = Vec::new();
    let mut lines = Vec::new();
    for id in &ids {
        match store.load(id) {
            Ok(record) => {
                lines.push(format!(
                    "{} {} {}",
                    format!("{id:20}").cyan(),
                    record.summary,
                    format!("({} steps)", record.steps.len()).dimmed()
                ));
                entries.push(json!({
                    "id": id,
                    "summary": record.summary,
                    "steps": record.steps.len(),
                    "project_key": record.project_key,
                }));
            }
            Err(e) => {
                lines.push(format!("{} {}", format!("{id:20}").cyan(), e.to_string().red()));
                entries.push(json!({ "id": id, "error": e.to_string() }));
            }
        }
    }

    let text = if lines.is_empty() {
        format!("No records in {}", store.dir().display())
    } else {
        lines.join("\n")
    };

    CommandOutput::new(json!(entries)).with_text(text).print(output)
}
