use crate::audit::AnalysisReport;
use crate::github::{PullRequestApi, PullRequestRequest, PullRequestResult, parse_remote_url};
use crate::invoker::{ToolCommand, ToolOutput, ToolRunner};
use crate::scanner::{
    Candidate, LOCKFILE, MANIFEST, ParsedManifest, has_manifest, is_git_repository,
};
use crate::types::{Artifact, Operation, Outcome, PullRequestSpec, RepoOutcome, SkipReason};
use anyhow::{Context as _, Result, anyhow, bail};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// What an operation needs besides the repository itself
pub struct Context<'a> {
    pub runner: &'a dyn ToolRunner,
    pub pulls: Option<&'a dyn PullRequestApi>,
}

/// How a step sequence ended when no step raised
enum Flow {
    Done(Option<Artifact>),
    Skip(SkipReason),
}

/// Run `operation` against one repository. Every error is folded into the
/// returned outcome; nothing escapes to the caller.
pub fn run_operation(ctx: &Context, candidate: &Candidate, operation: &Operation) -> RepoOutcome {
    info!("{}: {}", operation.name(), candidate.path.display());

    let (outcome, artifact) = match execute(ctx, &candidate.path, operation) {
        Ok(Flow::Done(artifact)) => (Outcome::Succeeded, artifact),
        Ok(Flow::Skip(reason)) => (Outcome::Skipped(reason), None),
        Err(e) => (Outcome::Failed(format!("{:#}", e)), None),
    };
    debug!("{} -> {}", candidate.name, outcome.status());

    RepoOutcome {
        path: candidate.path.clone(),
        name: candidate.name.clone(),
        outcome,
        artifact,
    }
}

fn execute(ctx: &Context, repo: &Path, operation: &Operation) -> Result<Flow> {
    let runner = ctx.runner;
    match operation {
        Operation::BranchCreate { branch } => create_branch(runner, repo, branch),
        Operation::BranchDelete { branch } => delete_branch(runner, repo, branch),
        Operation::CommitPush { message } => commit_and_push(runner, repo, message),
        Operation::FolderCopy { source, message } => copy_folder(runner, repo, source, message),
        Operation::PullRequest(spec) => create_pull_request(ctx, repo, spec),
        Operation::DependencyRemove { dependency } => remove_dependency(runner, repo, dependency),
        Operation::DependencyAudit => audit_dependencies(runner, repo),
        Operation::DiscardChanges => discard_non_manifest_changes(runner, repo),
        Operation::Rebuild => rebuild(runner, repo),
        Operation::LockfileRevert { base } => revert_lockfile(runner, repo, base),
    }
}

/// Execute a must-succeed git command and return its output
fn git(runner: &dyn ToolRunner, repo: &Path, args: &[&str]) -> Result<ToolOutput> {
    Ok(runner.run_checked(&ToolCommand::git(repo).args(args.iter().copied()))?)
}

fn npm(runner: &dyn ToolRunner, repo: &Path, args: &[&str]) -> Result<ToolOutput> {
    Ok(runner.run_checked(&ToolCommand::npm(repo).args(args.iter().copied()))?)
}

fn current_branch(runner: &dyn ToolRunner, repo: &Path) -> Result<String> {
    let output = git(runner, repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(output.stdout.trim().to_string())
}

fn create_branch(runner: &dyn ToolRunner, repo: &Path, branch: &str) -> Result<Flow> {
    if !is_git_repository(repo) {
        return Ok(Flow::Skip(SkipReason::NotGitRepository));
    }

    git(runner, repo, &["checkout", "-b", branch])?;
    git(runner, repo, &["push", "--set-upstream", "origin", branch])?;
    info!("Created branch '{}' and set upstream", branch);

    Ok(Flow::Done(None))
}

/// `master` when it exists locally, otherwise `main`. No further fallback.
fn fallback_branch(runner: &dyn ToolRunner, repo: &Path) -> Result<&'static str> {
    let probe = runner.run(
        &ToolCommand::git(repo).args(["show-ref", "--verify", "--quiet", "refs/heads/master"]),
    )?;
    Ok(if probe.success() { "master" } else { "main" })
}

fn delete_branch(runner: &dyn ToolRunner, repo: &Path, branch: &str) -> Result<Flow> {
    if !is_git_repository(repo) {
        return Ok(Flow::Skip(SkipReason::NotGitRepository));
    }

    if current_branch(runner, repo)? == branch {
        let fallback = fallback_branch(runner, repo)?;
        info!("Currently on '{}', switching to '{}'", branch, fallback);
        git(runner, repo, &["checkout", fallback])
            .with_context(|| format!("Could not switch away from '{}'", branch))?;
    }

    git(runner, repo, &["branch", "-D", branch])?;
    git(runner, repo, &["push", "origin", "--delete", branch])?;
    info!("Deleted local and remote branch '{}'", branch);

    Ok(Flow::Done(None))
}

fn stage_commit_push(runner: &dyn ToolRunner, repo: &Path, message: &str) -> Result<()> {
    git(runner, repo, &["add", "."])?;
    git(runner, repo, &["commit", "-m", message])?;
    git(runner, repo, &["push"])?;
    Ok(())
}

fn commit_and_push(runner: &dyn ToolRunner, repo: &Path, message: &str) -> Result<Flow> {
    if !is_git_repository(repo) {
        return Ok(Flow::Skip(SkipReason::NotGitRepository));
    }

    stage_commit_push(runner, repo, message)?;
    Ok(Flow::Done(None))
}

/// Copy the tree at `source` to `dest`, which must not exist yet.
/// Symlinks are followed and their targets copied.
fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn copy_folder(
    runner: &dyn ToolRunner,
    repo: &Path,
    source: &Path,
    message: &str,
) -> Result<Flow> {
    if !is_git_repository(repo) {
        return Ok(Flow::Skip(SkipReason::NotGitRepository));
    }

    let folder_name = source
        .file_name()
        .ok_or_else(|| anyhow!("Source folder {} has no name", source.display()))?;
    let destination = repo.join(folder_name);
    if destination.exists() {
        return Ok(Flow::Skip(SkipReason::DestinationExists(
            folder_name.to_string_lossy().to_string(),
        )));
    }

    if let Err(e) = copy_tree(source, &destination) {
        // A leftover partial copy would be skipped as "already exists" forever
        if let Err(cleanup) = fs::remove_dir_all(&destination) {
            warn!("Failed to remove partial copy {}: {}", destination.display(), cleanup);
        }
        return Err(e);
    }
    info!("Copied '{}' to {}", folder_name.to_string_lossy(), repo.display());

    stage_commit_push(runner, repo, message)?;
    Ok(Flow::Done(None))
}

fn create_pull_request(ctx: &Context, repo: &Path, spec: &PullRequestSpec) -> Result<Flow> {
    let runner = ctx.runner;
    if !is_git_repository(repo) {
        return Ok(Flow::Skip(SkipReason::NotGitRepository));
    }
    let api = ctx
        .pulls
        .ok_or_else(|| anyhow!("No pull request client configured"))?;

    git(runner, repo, &["push", "origin", "HEAD"])?;

    let remote = git(runner, repo, &["config", "--get", "remote.origin.url"])?;
    let remote = remote.stdout.trim();
    let Some(slug) = parse_remote_url(remote, api.host()) else {
        return Ok(Flow::Skip(SkipReason::UnsupportedRemote(remote.to_string())));
    };

    let request = PullRequestRequest {
        title: spec.title.clone(),
        head: spec.branch.clone(),
        base: spec
            .base
            .clone()
            .unwrap_or_else(|| api.default_base().to_string()),
        body: spec.body.clone(),
    };

    match api.create_pull_request(&slug, &request)? {
        PullRequestResult::Created { url } => {
            info!("Created PR for branch '{}': {}", spec.branch, url);
            Ok(Flow::Done(Some(Artifact::PullRequest { url })))
        }
        PullRequestResult::Rejected { status, body } => bail!(
            "Failed to create PR for branch '{}': {} - {}",
            spec.branch,
            status,
            body.trim()
        ),
    }
}

/// Remove `node_modules/` and the lockfile so the next install starts clean
fn clear_dependency_cache(repo: &Path) -> Result<()> {
    let modules = repo.join("node_modules");
    if modules.exists() {
        fs::remove_dir_all(&modules)
            .with_context(|| format!("Failed to remove {}", modules.display()))?;
    }
    let lockfile = repo.join(LOCKFILE);
    if lockfile.exists() {
        fs::remove_file(&lockfile)
            .with_context(|| format!("Failed to remove {}", lockfile.display()))?;
    }
    Ok(())
}

fn clean_build_install(runner: &dyn ToolRunner, repo: &Path) -> Result<()> {
    clear_dependency_cache(repo)?;
    npm(runner, repo, &["run", "build"])?;
    npm(runner, repo, &["install"])?;
    Ok(())
}

fn remove_dependency(runner: &dyn ToolRunner, repo: &Path, dependency: &str) -> Result<Flow> {
    if !has_manifest(repo) {
        return Ok(Flow::Skip(SkipReason::NoManifest));
    }
    match ParsedManifest::load(repo) {
        ParsedManifest::Invalid(e) => return Ok(Flow::Skip(SkipReason::InvalidManifest(e))),
        ParsedManifest::Parsed(manifest) if !manifest.declares(dependency) => {
            return Ok(Flow::Skip(SkipReason::DependencyNotFound(
                dependency.to_string(),
            )));
        }
        ParsedManifest::Parsed(_) => {}
    }

    npm(runner, repo, &["uninstall", dependency])?;
    clean_build_install(runner, repo)?;
    info!("Removed '{}'", dependency);

    Ok(Flow::Done(None))
}

fn rebuild(runner: &dyn ToolRunner, repo: &Path) -> Result<Flow> {
    if !has_manifest(repo) {
        return Ok(Flow::Skip(SkipReason::NoManifest));
    }

    clean_build_install(runner, repo)?;
    Ok(Flow::Done(None))
}

fn audit_dependencies(runner: &dyn ToolRunner, repo: &Path) -> Result<Flow> {
    if !has_manifest(repo) {
        return Ok(Flow::Skip(SkipReason::NoManifest));
    }

    let depcheck = if runner.locate("depcheck").is_some() {
        ToolCommand::new("depcheck", repo)
    } else {
        info!("depcheck not found on PATH, installing it locally");
        npm(runner, repo, &["install", "depcheck", "--no-save"])?;
        ToolCommand::new("npx", repo).arg("depcheck")
    };

    // depcheck exits non-zero whenever it finds something, so the status is ignored
    let output = runner.run(
        &depcheck
            .arg("--json")
            .env("NODE_OPTIONS", "--no-deprecation"),
    )?;
    if !output.stderr.trim().is_empty() {
        warn!("depcheck warnings in {}: {}", repo.display(), output.stderr.trim());
    }

    match AnalysisReport::parse(&output.stdout) {
        AnalysisReport::Parsed {
            mut dependencies,
            dev_dependencies,
        } => {
            dependencies.extend(dev_dependencies);
            info!("Found {} unused dependencies", dependencies.len());
            Ok(Flow::Done(Some(Artifact::UnusedDependencies { dependencies })))
        }
        AnalysisReport::Empty => Ok(Flow::Skip(SkipReason::EmptyAnalysisOutput)),
        AnalysisReport::Malformed(e) => Ok(Flow::Skip(SkipReason::MalformedAnalysisOutput(e))),
    }
}

/// Files from `git status --porcelain` that are the manifest or lockfile
fn modified_manifest_files(porcelain: &str) -> Vec<&str> {
    porcelain
        .lines()
        .filter_map(|line| line.get(3..))
        .filter(|path| *path == MANIFEST || *path == LOCKFILE)
        .collect()
}

fn discard_non_manifest_changes(runner: &dyn ToolRunner, repo: &Path) -> Result<Flow> {
    if !is_git_repository(repo) {
        return Ok(Flow::Skip(SkipReason::NotGitRepository));
    }

    let status = git(runner, repo, &["status", "--porcelain"])?;
    let backup = tempfile::tempdir().context("Failed to create backup directory")?;

    let mut saved = Vec::new();
    for file in modified_manifest_files(&status.stdout) {
        let path = repo.join(file);
        if path.is_file() {
            fs::copy(&path, backup.path().join(file))
                .with_context(|| format!("Failed to back up {}", path.display()))?;
            saved.push(file);
        }
    }

    git(runner, repo, &["reset", "--hard"])?;
    info!("All changes discarded in {}", repo.display());

    for file in saved {
        fs::copy(backup.path().join(file), repo.join(file))
            .with_context(|| format!("Failed to restore {}", file))?;
        info!("Restored changes to {}", file);
    }

    Ok(Flow::Done(None))
}

fn revert_lockfile(runner: &dyn ToolRunner, repo: &Path, base: &str) -> Result<Flow> {
    if !is_git_repository(repo) {
        return Ok(Flow::Skip(SkipReason::NotGitRepository));
    }

    git(runner, repo, &["fetch", "origin"])?;
    let reference = format!("origin/{}", base);
    git(runner, repo, &["checkout", &reference, "--", LOCKFILE])?;
    info!("Reverted {} to {}", LOCKFILE, reference);

    Ok(Flow::Done(None))
}
