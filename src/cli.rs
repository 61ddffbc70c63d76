use crate::config::{BatchConfig, PullRequestSettings};
use crate::types::{Operation, PullRequestSpec};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Apply one git or npm operation to every repository in a folder
#[derive(Parser, Debug)]
#[command(name = "repo-bulk")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Print per-repository outcomes as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Operation to run; starts the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct Target {
    /// Folder whose immediate subdirectories are the repositories
    #[arg(long, short = 'd', visible_alias = "directory", default_value = ".")]
    pub parent: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a branch, switch to it and push it with upstream tracking
    BranchCreate {
        #[command(flatten)]
        target: Target,
        #[arg(long, short)]
        branch: String,
    },

    /// Delete a branch locally and on origin
    BranchDelete {
        #[command(flatten)]
        target: Target,
        #[arg(long, short)]
        branch: String,
    },

    /// Stage everything, commit and push
    CommitPush {
        #[command(flatten)]
        target: Target,
        #[arg(long, short)]
        message: String,
    },

    /// Copy a folder into every repository, then commit and push
    FolderCopy {
        #[command(flatten)]
        target: Target,
        /// Folder to copy; lands at <repository>/<folder name>
        #[arg(long, short)]
        source: PathBuf,
        #[arg(long, short)]
        message: String,
    },

    /// Push the current branch and open a pull request for it
    PrCreate {
        #[command(flatten)]
        target: Target,
        /// Head branch of the pull request
        #[arg(long, short)]
        branch: String,
        #[arg(long, short)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Base branch (defaults to main, or master on Enterprise)
        #[arg(long)]
        base: Option<String>,
        /// GitHub Enterprise hostname
        #[arg(long, value_name = "HOST")]
        enterprise_host: Option<String>,
        /// Personal access token; prompted for when absent
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Uninstall an npm dependency, then clean, build and reinstall
    DepRemove {
        #[command(flatten)]
        target: Target,
        #[arg(long, visible_alias = "dep")]
        dependency: String,
    },

    /// Run depcheck everywhere and summarize unused dependencies
    DepAudit {
        #[command(flatten)]
        target: Target,
    },

    /// Discard all uncommitted changes except package.json and package-lock.json
    DiscardChanges {
        #[command(flatten)]
        target: Target,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Remove node_modules and the lockfile, then build and install
    Rebuild {
        #[command(flatten)]
        target: Target,
    },

    /// Restore package-lock.json from origin/<base>
    LockfileRevert {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value = "master")]
        base: String,
    },

    /// Interactive menu
    Menu,
}

impl Command {
    /// Whether the user still has to confirm before the batch runs
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Command::DiscardChanges { yes: false, .. })
    }

    /// Build the validated batch configuration. `prompt_token` is only called
    /// for pull requests when no token was given.
    pub fn into_config<F>(self, prompt_token: F) -> anyhow::Result<BatchConfig>
    where
        F: FnOnce() -> anyhow::Result<String>,
    {
        let (target, operation, pull_requests) = match self {
            Command::BranchCreate { target, branch } => {
                (target, Operation::BranchCreate { branch }, None)
            }
            Command::BranchDelete { target, branch } => {
                (target, Operation::BranchDelete { branch }, None)
            }
            Command::CommitPush { target, message } => {
                (target, Operation::CommitPush { message }, None)
            }
            Command::FolderCopy {
                target,
                source,
                message,
            } => (target, Operation::FolderCopy { source, message }, None),
            Command::PrCreate {
                target,
                branch,
                title,
                body,
                base,
                enterprise_host,
                token,
            } => {
                let token = match token {
                    Some(token) => token,
                    None => prompt_token()?,
                };
                (
                    target,
                    Operation::PullRequest(PullRequestSpec {
                        branch,
                        title,
                        body,
                        base,
                    }),
                    Some(PullRequestSettings {
                        token,
                        enterprise_host,
                    }),
                )
            }
            Command::DepRemove { target, dependency } => {
                (target, Operation::DependencyRemove { dependency }, None)
            }
            Command::DepAudit { target } => (target, Operation::DependencyAudit, None),
            Command::DiscardChanges { target, .. } => (target, Operation::DiscardChanges, None),
            Command::Rebuild { target } => (target, Operation::Rebuild, None),
            Command::LockfileRevert { target, base } => {
                (target, Operation::LockfileRevert { base }, None)
            }
            Command::Menu => anyhow::bail!("the menu has no batch configuration"),
        };

        Ok(BatchConfig::new(&target.parent, operation, pull_requests)?)
    }
}
