use crate::config::{BatchConfig, PullRequestSettings};
use crate::types::{Operation, PullRequestSpec};
use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Input, Password, Select, theme::ColorfulTheme};
use std::path::PathBuf;

/// Menu entries, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    SetParent,
    SetToken,
    CommitPush,
    BranchCreate,
    BranchDelete,
    FolderCopy,
    PullRequest,
    DependencyRemove,
    DependencyAudit,
    DiscardChanges,
    Rebuild,
    LockfileRevert,
    Exit,
}

const CHOICES: &[(MenuChoice, &str)] = &[
    (MenuChoice::SetParent, "set parent folder of repos"),
    (MenuChoice::SetToken, "set github personal access token"),
    (MenuChoice::CommitPush, "commit and push"),
    (MenuChoice::BranchCreate, "create then checkout branches"),
    (MenuChoice::BranchDelete, "delete branches"),
    (MenuChoice::FolderCopy, "copy folder into repositories"),
    (MenuChoice::PullRequest, "create PRs"),
    (MenuChoice::DependencyRemove, "remove an npm dependency"),
    (MenuChoice::DependencyAudit, "find unused npm dependencies"),
    (MenuChoice::DiscardChanges, "discard changes except package files"),
    (MenuChoice::Rebuild, "clean build and install"),
    (MenuChoice::LockfileRevert, "revert package-lock.json"),
    (MenuChoice::Exit, "exit"),
];

/// Values remembered between menu actions
#[derive(Default)]
struct Session {
    parent: Option<PathBuf>,
    token: Option<String>,
}

fn ask(prompt: &str) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn ask_with_default(prompt: &str, default: &str) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;
    Ok(value.trim().to_string())
}

/// Prompt for a personal access token without echoing it
pub fn prompt_token() -> Result<String> {
    let token = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter your GitHub Personal Access Token")
        .allow_empty_password(true)
        .interact()?;
    Ok(token.trim().to_string())
}

/// Ask before a destructive batch; defaults to "No"
pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact_opt()?;
    Ok(answer.unwrap_or(false))
}

fn select() -> Result<MenuChoice> {
    let labels: Vec<&str> = CHOICES.iter().map(|(_, label)| *label).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select an action")
        .items(&labels)
        .default(0)
        .interact_opt()?;

    Ok(match selection {
        Some(index) => CHOICES[index].0,
        None => MenuChoice::Exit,
    })
}

impl Session {
    fn set_parent(&mut self) -> Result<()> {
        let path = PathBuf::from(ask(
            "Enter the path to the folder containing your Git repositories",
        )?);
        if path.is_dir() {
            self.parent = Some(path);
        } else {
            println!(
                "{}: '{}' does not exist or is not a directory.",
                "Error".red(),
                path.display()
            );
        }
        Ok(())
    }

    fn token(&mut self) -> Result<String> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => {
                let token = prompt_token()?;
                self.token = Some(token.clone());
                Ok(token)
            }
        }
    }

    /// Prompt for the fields of `choice` and build its configuration
    fn configure(&mut self, choice: MenuChoice, parent: PathBuf) -> Result<BatchConfig> {
        let mut pull_requests = None;
        let operation = match choice {
            MenuChoice::CommitPush => Operation::CommitPush {
                message: ask("Enter the commit message to use for all repositories")?,
            },
            MenuChoice::BranchCreate => Operation::BranchCreate {
                branch: ask("Enter the name of the new branch")?,
            },
            MenuChoice::BranchDelete => Operation::BranchDelete {
                branch: ask("Enter the name of the branch to delete")?,
            },
            MenuChoice::FolderCopy => Operation::FolderCopy {
                source: PathBuf::from(ask(
                    "Enter the path to the folder you want to copy into all repositories",
                )?),
                message: ask("Enter the commit message to use for all repositories")?,
            },
            MenuChoice::PullRequest => {
                let spec = PullRequestSpec {
                    branch: ask("Enter the name of the branch to push and create a PR for")?,
                    title: ask("Enter the title for the Pull Request")?,
                    body: ask("Enter the description for the Pull Request")?,
                    base: None,
                };
                let host = ask("Enter the GitHub Enterprise host (leave empty for github.com)")?;
                pull_requests = Some(PullRequestSettings {
                    token: self.token()?,
                    enterprise_host: (!host.is_empty()).then_some(host),
                });
                Operation::PullRequest(spec)
            }
            MenuChoice::DependencyRemove => Operation::DependencyRemove {
                dependency: ask("Enter the npm dependency to remove")?,
            },
            MenuChoice::DependencyAudit => Operation::DependencyAudit,
            MenuChoice::DiscardChanges => Operation::DiscardChanges,
            MenuChoice::Rebuild => Operation::Rebuild,
            MenuChoice::LockfileRevert => Operation::LockfileRevert {
                base: ask_with_default("Base branch to restore package-lock.json from", "master")?,
            },
            MenuChoice::SetParent | MenuChoice::SetToken | MenuChoice::Exit => {
                anyhow::bail!("not a bulk action")
            }
        };

        Ok(BatchConfig::new(&parent, operation, pull_requests)?)
    }
}

/// Interactive loop. Each action prompts once, then runs one batch.
pub fn run(json: bool) -> Result<()> {
    let mut session = Session::default();

    loop {
        let choice = select()?;
        match choice {
            MenuChoice::Exit => {
                println!("Exiting the application. Goodbye!");
                return Ok(());
            }
            MenuChoice::SetParent => session.set_parent()?,
            MenuChoice::SetToken => {
                session.token = None;
                session.token()?;
            }
            action => {
                let Some(parent) = session.parent.clone() else {
                    println!("Parent folder not set. Please set the parent folder first.");
                    continue;
                };

                let config = match session.configure(action, parent) {
                    Ok(config) => config,
                    Err(e) => {
                        println!("{}: {}", "Error".red(), e);
                        continue;
                    }
                };

                if action == MenuChoice::DiscardChanges
                    && !confirm("Discard all uncommitted changes except package files?")?
                {
                    println!("Aborted.");
                    continue;
                }

                // Batch-level errors go back to the menu instead of exiting
                if let Err(e) = crate::execute(&config, json) {
                    println!("{}: {}", "Error".red(), e);
                    println!("\nOperation failed.");
                }
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_lists_every_operation_once() {
        let actions: Vec<MenuChoice> = CHOICES.iter().map(|(c, _)| *c).collect();
        assert_eq!(actions.len(), 13);
        assert_eq!(actions.last(), Some(&MenuChoice::Exit));
        for (i, choice) in actions.iter().enumerate() {
            assert!(!actions[i + 1..].contains(choice));
        }
    }

    #[test]
    fn test_configure_rejects_menu_only_choices() {
        let mut session = Session::default();
        assert!(
            session
                .configure(MenuChoice::Exit, PathBuf::from("/repos"))
                .is_err()
        );
    }
}
