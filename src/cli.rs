use clap::{Args, Parser, Subcommand};

use crate::import::LinkRequest;
use crate::remote::CollectionKind;

#[derive(Parser)]
#[command(name = "caseport")]
#[command(about = "Import local test cases into a remote test-management service")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (overridden by CASEPORT_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format shared by all commands
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct OutputOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the steps an import of a record would perform
    Steps {
        /// Record id
        record: String,

        #[command(flatten)]
        links: LinkArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Create a test from a local record and link it
    #[command(visible_alias = "i")]
    Import {
        /// Record id
        record: String,

        /// Target project key (default: the record's project_key)
        #[arg(short, long)]
        project: Option<String>,

        #[command(flatten)]
        links: LinkArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Link an existing remote test and verify the links
    Link {
        /// Remote issue id of the test
        issue_id: String,

        #[command(flatten)]
        links: LinkArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// List local records
    Records {
        #[command(flatten)]
        output: OutputOptions,
    },

    /// Browse remote collections of a project
    Collections {
        /// plans, executions, sets, preconditions or folders
        kind: String,

        /// Project key (required for everything but folders)
        #[arg(short, long)]
        project: Option<String>,

        /// Numeric project id (required for folders)
        #[arg(long)]
        project_id: Option<u64>,

        /// Maximum number of entries
        #[arg(long, default_value_t = 100)]
        limit: u32,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Display current configuration
    Show {
        #[command(flatten)]
        output: OutputOptions,
    },

    /// Set a configuration value
    Set {
        /// Key: base_url, auth.client_id, auth.client_secret, poll.max_attempts, poll.interval_ms
        key: String,

        /// Value to set
        value: String,

        #[command(flatten)]
        output: OutputOptions,
    },
}

/// Link targets given on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct LinkArgs {
    /// Test plan issue id (repeatable)
    #[arg(long = "plan", value_name = "ID")]
    pub plans: Vec<String>,

    /// Test execution issue id (repeatable)
    #[arg(long = "execution", value_name = "ID")]
    pub executions: Vec<String>,

    /// Test set issue id (repeatable)
    #[arg(long = "set", value_name = "ID")]
    pub sets: Vec<String>,

    /// Precondition issue id (repeatable)
    #[arg(long = "precondition", value_name = "ID")]
    pub preconditions: Vec<String>,

    /// Repository folder path, e.g. /Regression/Auth
    #[arg(long, value_name = "PATH")]
    pub folder: Option<String>,

    /// Numeric project id the folder belongs to
    #[arg(long = "folder-project", value_name = "ID")]
    pub folder_project: Option<u64>,
}

impl LinkArgs {
    /// Apply these flags on top of `base`. Each non-empty flag replaces the
    /// corresponding field.
    pub fn apply_to(&self, mut base: LinkRequest) -> LinkRequest {
        if !self.plans.is_empty() {
            base.test_plans = self.plans.clone();
        }
        if !self.executions.is_empty() {
            base.test_executions = self.executions.clone();
        }
        if !self.sets.is_empty() {
            base.test_sets = self.sets.clone();
        }
        if !self.preconditions.is_empty() {
            base.preconditions = self.preconditions.clone();
        }
        if self.folder.is_some() {
            base.folder_path = self.folder.clone();
        }
        if self.folder_project.is_some() {
            base.project_id = self.folder_project;
        }
        base
    }
}

/// Target of `caseport collections`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseTarget {
    Collection(CollectionKind),
    Folders,
}

impl std::str::FromStr for BrowseTarget {
    type Err = crate::error::CaseportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "folder" | "folders" => Ok(BrowseTarget::Folders),
            other => other.parse().map(BrowseTarget::Collection),
        }
    }
}
