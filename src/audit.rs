//! depcheck output parsing and the cross-project unused-dependency report

use crate::types::{Artifact, Outcome, RepoOutcome, SkipReason};
use anyhow::{Context, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::Path;

pub const REPORT_FILE: &str = "unused_dependencies_report.json";

/// Parsed `depcheck --json` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisReport {
    Parsed {
        dependencies: Vec<String>,
        dev_dependencies: Vec<String>,
    },
    Malformed(String),
    Empty,
}

#[derive(Deserialize)]
struct DepcheckJson {
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: Vec<String>,
}

impl AnalysisReport {
    pub fn parse(stdout: &str) -> Self {
        if stdout.trim().is_empty() {
            return AnalysisReport::Empty;
        }
        match serde_json::from_str::<DepcheckJson>(stdout) {
            Ok(json) => AnalysisReport::Parsed {
                dependencies: json.dependencies,
                dev_dependencies: json.dev_dependencies,
            },
            Err(e) => AnalysisReport::Malformed(e.to_string()),
        }
    }
}

/// Insertion-ordered `key -> [values]`, serialized as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedGroups(Vec<(String, Vec<String>)>);

impl OrderedGroups {
    pub fn insert(&mut self, key: &str, values: Vec<String>) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => existing.extend(values),
            None => self.0.push((key.to_string(), values)),
        }
    }

    pub fn push(&mut self, key: &str, value: &str) {
        self.insert(key, vec![value.to_string()]);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for OrderedGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, values) in &self.0 {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Projects whose depcheck run finished, usable or not
    pub processed: usize,
    /// Projects without usable output. Malformed output and failed runs
    /// count here as well as in `processed`.
    pub skipped: usize,
}

/// Written to `unused_dependencies_report.json` in the parent folder
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub summary: AuditSummary,
    pub unused_by_project: OrderedGroups,
    pub projects_by_dependency: OrderedGroups,
}

impl AuditReport {
    /// Fold batch outcomes, kept in enumeration order, into the report
    pub fn from_outcomes(outcomes: &[RepoOutcome]) -> Self {
        let mut report = AuditReport::default();

        for outcome in outcomes {
            match &outcome.outcome {
                Outcome::Succeeded => report.summary.processed += 1,
                Outcome::Failed(_) | Outcome::Skipped(SkipReason::MalformedAnalysisOutput(_)) => {
                    report.summary.processed += 1;
                    report.summary.skipped += 1;
                }
                Outcome::Skipped(_) => report.summary.skipped += 1,
            }

            if let Some(Artifact::UnusedDependencies { dependencies }) = &outcome.artifact {
                report
                    .unused_by_project
                    .insert(&outcome.name, dependencies.clone());
                for dep in dependencies {
                    report.projects_by_dependency.push(dep, &outcome.name);
                }
            }
        }

        report
    }

    /// No project produced usable depcheck output
    pub fn is_empty(&self) -> bool {
        self.unused_by_project.is_empty()
    }

    /// Dependencies by number of projects, most common first. Ties keep the
    /// order in which the dependency was first reported.
    pub fn ranking(&self) -> Vec<(&str, usize)> {
        let mut ranking: Vec<(&str, usize)> = self
            .projects_by_dependency
            .iter()
            .map(|(dep, projects)| (dep, projects.len()))
            .collect();
        ranking.sort_by(|a, b| b.1.cmp(&a.1));
        ranking
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }
}
