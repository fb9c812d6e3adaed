use clap::Parser;
use std::process::ExitCode;

use caseport::cli::{Cli, Commands, ConfigAction};
use caseport::commands::{
    cmd_collections, cmd_config_set, cmd_config_show, cmd_import, cmd_link, cmd_records,
    cmd_steps,
};
use caseport::logging;

/// Exit code when the test exists but linking or verification reported problems
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Steps {
            record,
            links,
            output,
        } => cmd_steps(&record, &links, output).map(|_| true),
        Commands::Import {
            record,
            project,
            links,
            output,
        } => cmd_import(&record, project.as_deref(), &links, output).await,
        Commands::Link {
            issue_id,
            links,
            output,
        } => cmd_link(&issue_id, &links, output).await,
        Commands::Records { output } => cmd_records(output).map(|_| true),
        Commands::Collections {
            kind,
            project,
            project_id,
            limit,
            output,
        } => cmd_collections(&kind, project.as_deref(), project_id, limit, output)
            .await
            .map(|_| true),
        Commands::Config { action } => match action {
            ConfigAction::Show { output } => cmd_config_show(output).map(|_| true),
            ConfigAction::Set { key, value, output } => {
                cmd_config_set(&key, &value, output).map(|_| true)
            }
        },
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_PARTIAL),
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
