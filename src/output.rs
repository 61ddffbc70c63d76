use crate::audit::AuditReport;
use crate::batch::BatchReport;
use crate::types::{Artifact, Outcome, RepoOutcome, Status};
use colored::Colorize;

const PROJECT_COLUMN: usize = 30;

fn separator() {
    println!("{}", "=".repeat(50).dimmed());
}

/// Print one repository's outcome as soon as it is known
pub fn print_outcome(result: &RepoOutcome) {
    let path_str = result.path.display().to_string();
    let status_str = match result.status() {
        Status::Succeeded => "SUCCEEDED".green().bold(),
        Status::Skipped => "SKIPPED".yellow().bold(),
        Status::Failed => "FAILED".red().bold(),
    };

    println!("{} [{}]", path_str.bold(), status_str);

    match &result.outcome {
        Outcome::Succeeded => {}
        Outcome::Skipped(reason) => println!("  - {}", reason),
        Outcome::Failed(msg) => println!("    {}: {}", "Error".red(), msg),
    }

    match &result.artifact {
        Some(Artifact::PullRequest { url }) => println!("  PR URL: {}", url),
        Some(Artifact::UnusedDependencies { dependencies }) => {
            println!("  Found {} unused dependencies", dependencies.len())
        }
        None => {}
    }
}

pub fn print_header(operation: &str, parent: &std::path::Path) {
    println!(
        "Running {} in repositories under '{}'",
        operation.bold(),
        parent.display()
    );
    separator();
}

/// Final tally; printed even when every repository failed
pub fn print_summary(report: &BatchReport) {
    let tally = report.tally();

    separator();
    println!(
        "Summary: {} total, {} {}, {} {}, {} {}",
        report.outcomes.len(),
        tally.succeeded,
        "SUCCEEDED".green(),
        tally.skipped,
        "SKIPPED".yellow(),
        tally.failed,
        "FAILED".red()
    );
}

pub fn print_json(report: &BatchReport) {
    let json_str = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    println!("{}", json_str);
}

pub fn print_pull_request_links(report: &BatchReport) {
    let links = report.pull_request_links();
    if links.is_empty() {
        return;
    }

    println!("\nPull Request Links:");
    for (path, url) in links {
        println!("{}: {}", path.display(), url);
    }
}

/// Shorten a comma-separated project list to fit the table column
fn truncate_projects(projects: &[String]) -> String {
    let list = projects.join(", ");
    if list.chars().count() > PROJECT_COLUMN {
        let head: String = list.chars().take(PROJECT_COLUMN - 3).collect();
        format!("{}...", head)
    } else {
        list
    }
}

pub fn print_audit_table(audit: &AuditReport) {
    println!();
    println!("{}", "Unused dependencies across all projects:".bold());
    separator();
    println!("{:<40} {:<8} {}", "Dependency", "Count", "Projects");
    println!("{} {} {}", "-".repeat(40), "-".repeat(8), "-".repeat(PROJECT_COLUMN));

    for (dep, count) in audit.ranking() {
        let projects = audit
            .projects_by_dependency
            .get(dep)
            .map(truncate_projects)
            .unwrap_or_default();
        println!("{:<40} {:<8} {}", dep, count, projects);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_projects() {
        let short = vec!["repo1".to_string(), "repo2".to_string()];
        assert_eq!(truncate_projects(&short), "repo1, repo2");

        let long: Vec<String> = (0..10).map(|i| format!("project-{}", i)).collect();
        let truncated = truncate_projects(&long);
        assert_eq!(truncated.chars().count(), PROJECT_COLUMN);
        assert!(truncated.ends_with("..."));
    }
}
