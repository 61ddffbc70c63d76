//! Pull request creation against GitHub or a GitHub Enterprise host

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};

pub const GITHUB_HOST: &str = "github.com";
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// `{owner}/{repo}` taken from a remote URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

/// Parse `https://<host>/<owner>/<repo>[.git]` or `git@<host>:<owner>/<repo>[.git]`.
/// Any other syntax, or a different host, yields `None`.
pub fn parse_remote_url(url: &str, host: &str) -> Option<RepoSlug> {
    let url = url.trim();
    let https = format!("https://{}/", host);
    let ssh = format!("git@{}:", host);

    let rest = url
        .strip_prefix(https.as_str())
        .or_else(|| url.strip_prefix(ssh.as_str()))?;
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some(RepoSlug {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Request body of `POST /repos/{owner}/{repo}/pulls`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestResult {
    Created { url: String },
    Rejected { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct CreatedPullRequest {
    html_url: String,
}

pub trait PullRequestApi {
    /// Host that remote URLs must point at
    fn host(&self) -> &str;

    /// Base branch used when the request does not name one
    fn default_base(&self) -> &str;

    fn create_pull_request(
        &self,
        slug: &RepoSlug,
        request: &PullRequestRequest,
    ) -> Result<PullRequestResult>;
}

/// Blocking GitHub REST client
pub struct GitHubClient {
    api_url: String,
    host: String,
    default_base: String,
    token: String,
    http: HttpClient,
}

impl GitHubClient {
    /// github.com; PRs target `main` by default
    pub fn public(token: String) -> Result<Self> {
        Self::build(GITHUB_API_URL.to_string(), GITHUB_HOST.to_string(), "main", token)
    }

    /// GitHub Enterprise at `host`; PRs target `master` by default
    pub fn enterprise(host: &str, token: String) -> Result<Self> {
        let host = host
            .trim()
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();
        Self::build(format!("https://{}/api/v3", host), host, "master", token)
    }

    fn build(api_url: String, host: String, default_base: &str, token: String) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(concat!("repo-bulk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url,
            host,
            default_base: default_base.to_string(),
            token,
            http,
        })
    }

    pub fn pulls_url(&self, slug: &RepoSlug) -> String {
        format!("{}/repos/{}/{}/pulls", self.api_url, slug.owner, slug.repo)
    }
}

impl PullRequestApi for GitHubClient {
    fn host(&self) -> &str {
        &self.host
    }

    fn default_base(&self) -> &str {
        &self.default_base
    }

    fn create_pull_request(
        &self,
        slug: &RepoSlug,
        request: &PullRequestRequest,
    ) -> Result<PullRequestResult> {
        let url = self.pulls_url(slug);
        log::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .json(request)
            .send()
            .with_context(|| format!("Failed to send pull request to {}", url))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().unwrap_or_default();
            return Ok(PullRequestResult::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let created = response
            .json::<CreatedPullRequest>()
            .context("Failed to parse pull request response")?;
        Ok(PullRequestResult::Created {
            url: created.html_url,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn slug(owner: &str, repo: &str) -> Option<RepoSlug> {
        Some(RepoSlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    #[test]
    fn test_parse_https_remote() {
        assert_eq!(
            parse_remote_url("https://github.com/acme/widgets.git", GITHUB_HOST),
            slug("acme", "widgets")
        );
        assert_eq!(
            parse_remote_url("https://github.com/acme/widgets", GITHUB_HOST),
            slug("acme", "widgets")
        );
    }

    #[test]
    fn test_parse_ssh_remote() {
        assert_eq!(
            parse_remote_url("git@github.com:acme/widgets.git\n", GITHUB_HOST),
            slug("acme", "widgets")
        );
    }

    #[test]
    fn test_parse_rejects_other_syntaxes() {
        assert_eq!(parse_remote_url("ssh://git@github.com/acme/w.git", GITHUB_HOST), None);
        assert_eq!(parse_remote_url("https://gitlab.com/acme/w.git", GITHUB_HOST), None);
        assert_eq!(parse_remote_url("https://github.com/acme", GITHUB_HOST), None);
        assert_eq!(parse_remote_url("", GITHUB_HOST), None);
    }

    #[test]
    fn test_parse_enterprise_host() {
        assert_eq!(
            parse_remote_url("git@github.corp.example:team/svc.git", "github.corp.example"),
            slug("team", "svc")
        );
    }

    #[test]
    fn test_enterprise_client_targets_api_v3() {
        let client =
            GitHubClient::enterprise("https://github.corp.example/", "t".to_string()).unwrap();
        assert_eq!(client.host(), "github.corp.example");
        assert_eq!(client.default_base(), "master");
        assert_eq!(
            client.pulls_url(&RepoSlug {
                owner: "team".to_string(),
                repo: "svc".to_string()
            }),
            "https://github.corp.example/api/v3/repos/team/svc/pulls"
        );
    }

    #[test]
    fn test_public_client_defaults_to_main() {
        let client = GitHubClient::public("t".to_string()).unwrap();
        assert_eq!(client.host(), GITHUB_HOST);
        assert_eq!(client.default_base(), "main");
    }
}
