use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// One bulk action and the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    BranchCreate { branch: String },
    BranchDelete { branch: String },
    CommitPush { message: String },
    FolderCopy { source: PathBuf, message: String },
    PullRequest(PullRequestSpec),
    DependencyRemove { dependency: String },
    DependencyAudit,
    DiscardChanges,
    Rebuild,
    LockfileRevert { base: String },
}

/// Fields of a pull request that are the same for every repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSpec {
    pub branch: String,
    pub title: String,
    pub body: String,
    /// Base branch; `None` uses the backend default
    pub base: Option<String>,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::BranchCreate { .. } => "branch-create",
            Operation::BranchDelete { .. } => "branch-delete",
            Operation::CommitPush { .. } => "commit-push",
            Operation::FolderCopy { .. } => "folder-copy",
            Operation::PullRequest(_) => "pr-create",
            Operation::DependencyRemove { .. } => "dep-remove",
            Operation::DependencyAudit => "dep-audit",
            Operation::DiscardChanges => "discard-changes",
            Operation::Rebuild => "rebuild",
            Operation::LockfileRevert { .. } => "lockfile-revert",
        }
    }

    /// Reject empty required fields. Runs once, before any repository is touched.
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::BranchCreate { branch } | Operation::BranchDelete { branch } => {
                require("Branch name", branch)
            }
            Operation::CommitPush { message } => require("Commit message", message),
            Operation::FolderCopy { source, message } => {
                if !source.is_dir() || source.file_name().is_none() {
                    return Err(Error::SourceNotDirectory(source.clone()));
                }
                require("Commit message", message)
            }
            Operation::PullRequest(spec) => {
                require("Branch name", &spec.branch)?;
                require("PR title", &spec.title)?;
                match &spec.base {
                    Some(base) => require("Base branch", base),
                    None => Ok(()),
                }
            }
            Operation::DependencyRemove { dependency } => require("Dependency name", dependency),
            Operation::LockfileRevert { base } => require("Base branch", base),
            Operation::DependencyAudit | Operation::DiscardChanges | Operation::Rebuild => Ok(()),
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::EmptyField(field));
    }
    Ok(())
}

/// Terminal state of one repository within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Succeeded,
    Skipped,
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Succeeded => write!(f, "SUCCEEDED"),
            Status::Skipped => write!(f, "SKIPPED"),
            Status::Failed => write!(f, "FAILED"),
        }
    }
}

/// Why a repository was not eligible for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotGitRepository,
    NoManifest,
    InvalidManifest(String),
    DependencyNotFound(String),
    DestinationExists(String),
    UnsupportedRemote(String),
    EmptyAnalysisOutput,
    MalformedAnalysisOutput(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotGitRepository => write!(f, "Not a Git repository"),
            SkipReason::NoManifest => write!(f, "Not an NPM project (no package.json)"),
            SkipReason::InvalidManifest(msg) => write!(f, "Invalid package.json: {}", msg),
            SkipReason::DependencyNotFound(dep) => write!(f, "Dependency '{}' not found", dep),
            SkipReason::DestinationExists(name) => {
                write!(f, "Folder '{}' already exists. Skipping copy", name)
            }
            SkipReason::UnsupportedRemote(url) => {
                write!(f, "Unsupported remote URL format: {}", url)
            }
            SkipReason::EmptyAnalysisOutput => write!(f, "No output received from depcheck"),
            SkipReason::MalformedAnalysisOutput(msg) => {
                write!(f, "Failed to parse depcheck output: {}", msg)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Skipped(SkipReason),
    /// Message of the step that failed
    Failed(String),
}

impl Outcome {
    pub fn status(&self) -> Status {
        match self {
            Outcome::Succeeded => Status::Succeeded,
            Outcome::Skipped(_) => Status::Skipped,
            Outcome::Failed(_) => Status::Failed,
        }
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Succeeded => None,
            Outcome::Skipped(reason) => Some(reason.to_string()),
            Outcome::Failed(msg) => Some(msg.clone()),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outcome", 2)?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("reason", &self.reason())?;
        state.end()
    }
}

/// Data a successful step sequence hands back to the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    PullRequest { url: String },
    UnusedDependencies { dependencies: Vec<String> },
}

/// Result of running one operation against one repository
#[derive(Debug, Clone, Serialize)]
pub struct RepoOutcome {
    pub path: PathBuf,
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl RepoOutcome {
    pub fn status(&self) -> Status {
        self.outcome.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_branch() {
        let op = Operation::BranchDelete {
            branch: "   ".to_string(),
        };
        assert!(matches!(op.validate(), Err(Error::EmptyField("Branch name"))));
    }

    #[test]
    fn test_validate_pull_request_requires_title() {
        let op = Operation::PullRequest(PullRequestSpec {
            branch: "feature".to_string(),
            title: String::new(),
            body: String::new(),
            base: None,
        });
        assert!(matches!(op.validate(), Err(Error::EmptyField("PR title"))));
    }

    #[test]
    fn test_validate_folder_copy_requires_directory() {
        let op = Operation::FolderCopy {
            source: PathBuf::from("/definitely/not/here"),
            message: "add".to_string(),
        };
        assert!(matches!(op.validate(), Err(Error::SourceNotDirectory(_))));
    }

    #[test]
    fn test_outcome_serializes_status_and_reason() {
        let outcome = RepoOutcome {
            path: PathBuf::from("/repos/b"),
            name: "b".to_string(),
            outcome: Outcome::Skipped(SkipReason::NotGitRepository),
            artifact: None,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "SKIPPED");
        assert_eq!(value["reason"], "Not a Git repository");
        assert_eq!(value["name"], "b");
        assert!(value.get("artifact").is_none());
    }
}
