use crate::driver::{Context, run_operation};
use crate::error::{Error, Result};
use crate::scanner::list_candidates;
use crate::types::{Artifact, Operation, RepoOutcome, Status};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome counts of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Every repository's outcome, in enumeration order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub operation: &'static str,
    pub parent: PathBuf,
    pub outcomes: Vec<RepoOutcome>,
}

impl BatchReport {
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for outcome in &self.outcomes {
            match outcome.status() {
                Status::Succeeded => tally.succeeded += 1,
                Status::Skipped => tally.skipped += 1,
                Status::Failed => tally.failed += 1,
            }
        }
        tally
    }

    /// `(repository path, PR URL)` for every pull request created
    pub fn pull_request_links(&self) -> Vec<(&Path, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.artifact {
                Some(Artifact::PullRequest { url }) => Some((o.path.as_path(), url.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Run `operation` once per subdirectory of `parent`, in listing order.
///
/// Only a missing or empty parent is an error; per-repository failures are
/// recorded in the report. `on_outcome` sees each outcome as soon as it is
/// known.
pub fn run_batch<F>(
    ctx: &Context,
    parent: &Path,
    operation: &Operation,
    mut on_outcome: F,
) -> Result<BatchReport>
where
    F: FnMut(&RepoOutcome),
{
    let candidates = list_candidates(parent)?;
    if candidates.is_empty() {
        return Err(Error::NoSubdirectories(parent.to_path_buf()));
    }
    info!(
        "{} over {} directories in {}",
        operation.name(),
        candidates.len(),
        parent.display()
    );

    let mut outcomes = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let outcome = run_operation(ctx, candidate, operation);
        on_outcome(&outcome);
        outcomes.push(outcome);
    }

    Ok(BatchReport {
        operation: operation.name(),
        parent: parent.to_path_buf(),
        outcomes,
    })
}
