use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::types::Operation;
use std::fmt;
use std::path::{Path, PathBuf};

/// Credentials and host for pull request creation
#[derive(Clone)]
pub struct PullRequestSettings {
    pub token: String,
    /// GitHub Enterprise hostname; `None` targets github.com
    pub enterprise_host: Option<String>,
}

impl fmt::Debug for PullRequestSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullRequestSettings")
            .field("token", &"<redacted>")
            .field("enterprise_host", &self.enterprise_host)
            .finish()
    }
}

impl PullRequestSettings {
    pub fn client(&self) -> anyhow::Result<GitHubClient> {
        match &self.enterprise_host {
            Some(host) => GitHubClient::enterprise(host, self.token.clone()),
            None => GitHubClient::public(self.token.clone()),
        }
    }
}

/// Everything one batch needs, validated before any repository is touched
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub parent: PathBuf,
    pub operation: Operation,
    pub pull_requests: Option<PullRequestSettings>,
}

impl BatchConfig {
    pub fn new(
        parent: &Path,
        operation: Operation,
        pull_requests: Option<PullRequestSettings>,
    ) -> Result<Self> {
        let operation = match operation {
            Operation::FolderCopy { source, message } => Operation::FolderCopy {
                source: absolute(&source)?,
                message,
            },
            other => other,
        };

        let config = Self {
            parent: absolute(parent)?,
            operation,
            pull_requests,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.operation.validate()?;

        if let Operation::PullRequest(_) = self.operation {
            match &self.pull_requests {
                Some(settings) if !settings.token.trim().is_empty() => {
                    if let Some(host) = &settings.enterprise_host {
                        if host.trim().is_empty() {
                            return Err(Error::EmptyField("Enterprise host"));
                        }
                    }
                }
                _ => return Err(Error::EmptyField("GitHub personal access token")),
            }
        }
        Ok(())
    }
}

/// Absolute form of `path` without requiring it to exist
fn absolute(path: &Path) -> Result<PathBuf> {
    let expanded = match path.to_str() {
        Some(s) if s == "~" || s.starts_with("~/") => match std::env::var_os("HOME") {
            Some(home) => {
                PathBuf::from(home).join(s.trim_start_matches('~').trim_start_matches('/'))
            }
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    };
    Ok(std::path::absolute(expanded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PullRequestSpec;
    use tempfile::TempDir;

    fn pr() -> Operation {
        Operation::PullRequest(PullRequestSpec {
            branch: "feature".to_string(),
            title: "Title".to_string(),
            body: String::new(),
            base: None,
        })
    }

    #[test]
    fn test_parent_made_absolute() {
        let config = BatchConfig::new(Path::new("repos"), Operation::Rebuild, None).unwrap();
        assert!(config.parent.is_absolute());
        assert!(config.parent.ends_with("repos"));
    }

    #[test]
    fn test_pull_request_requires_token() {
        assert!(matches!(
            BatchConfig::new(Path::new("/repos"), pr(), None),
            Err(Error::EmptyField(_))
        ));

        let blank = PullRequestSettings {
            token: " ".to_string(),
            enterprise_host: None,
        };
        assert!(BatchConfig::new(Path::new("/repos"), pr(), Some(blank)).is_err());

        let good = PullRequestSettings {
            token: "ghp_x".to_string(),
            enterprise_host: Some("github.corp.example".to_string()),
        };
        assert!(BatchConfig::new(Path::new("/repos"), pr(), Some(good)).is_ok());
    }

    #[test]
    fn test_folder_copy_source_resolved() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("templates");
        std::fs::create_dir(&source).unwrap();

        let config = BatchConfig::new(
            Path::new("/repos"),
            Operation::FolderCopy {
                source: source.clone(),
                message: "add templates".to_string(),
            },
            None,
        )
        .unwrap();
        assert_eq!(
            config.operation,
            Operation::FolderCopy {
                source,
                message: "add templates".to_string()
            }
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let settings = PullRequestSettings {
            token: "ghp_secret".to_string(),
            enterprise_host: None,
        };
        assert!(!format!("{:?}", settings).contains("ghp_secret"));
    }
}
