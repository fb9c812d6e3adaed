use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::{BrowseTarget, OutputOptions};
use crate::config::Config;
use crate::error::{CaseportError, Result};
use crate::remote::{RemoteClient, TestManagementApi};

/// Browse remote collections or the folder tree of a project
pub async fn cmd_collections(
    kind: &str,
    project: Option<&str>,
    project_id: Option<u64>,
    limit: u32,
    output: OutputOptions,
) -> Result<()> {
    let target: BrowseTarget = kind.parse()?;
    let config = Config::load()?;
    let client = RemoteClient::from_config(&config)?;

    match target {
        BrowseTarget::Folders => {
            let project_id = project_id.ok_or_else(|| {
                CaseportError::Config("listing folders requires --project-id".to_string())
            })?;
            let folders = client.list_folders(project_id).await?;
            let text = if folders.is_empty() {
                "No folders".dimmed().to_string()
            } else {
                folders.join("\n")
            };
            CommandOutput::new(json!({ "project_id": project_id, "folders": folders }))
                .with_text(text)
                .print(output)
        }
        BrowseTarget::Collection(kind) => {
            let project = project.ok_or_else(|| {
                CaseportError::Config(format!("listing {kind} requires --project"))
            })?;
            let items = client.list_collection(kind, project, limit).await?;

            let text = if items.is_empty() {
                format!("No {kind} in {project}").dimmed().to_string()
            } else {
                items
                    .iter()
                    .map(|item| {
                        format!(
                            "{} {} {}",
                            format!("{:12}", item.key.as_deref().unwrap_or("-")).cyan(),
                            format!("{:10}", item.issue_id).dimmed(),
                            item.summary.as_deref().unwrap_or("")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            CommandOutput::new(json!({ "kind": kind, "project": project, "items": items }))
                .with_text(text)
                .print(output)
        }
    }
}
