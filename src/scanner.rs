use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST: &str = "package.json";
pub const LOCKFILE: &str = "package-lock.json";

/// One immediate subdirectory of the parent folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub name: String,
}

/// Check if a directory is a Git repository.
/// Only targets normal repositories where .git is a directory (excludes submodules).
pub fn is_git_repository(path: &Path) -> bool {
    let git_path = path.join(".git");
    git_path.exists() && git_path.is_dir()
}

/// Check if a directory is an npm project
pub fn has_manifest(path: &Path) -> bool {
    path.join(MANIFEST).is_file()
}

/// List the directories directly under `parent`, in directory-listing order.
/// Files are ignored and nothing is recursed into.
pub fn list_candidates(parent: &Path) -> Result<Vec<Candidate>> {
    if !parent.exists() {
        return Err(Error::ParentNotFound(parent.to_path_buf()));
    }
    if !parent.is_dir() {
        return Err(Error::NotADirectory(parent.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(parent)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            candidates.push(Candidate {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
            });
        }
    }

    Ok(candidates)
}

/// The two dependency sections of `package.json`
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, Value>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, Value>,
}

impl Manifest {
    pub fn declares(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }
}

#[derive(Debug)]
pub enum ParsedManifest {
    Parsed(Manifest),
    /// Unreadable or not valid JSON
    Invalid(String),
}

impl ParsedManifest {
    pub fn load(project: &Path) -> Self {
        let text = match fs::read_to_string(project.join(MANIFEST)) {
            Ok(text) => text,
            Err(e) => return ParsedManifest::Invalid(e.to_string()),
        };
        match serde_json::from_str::<Manifest>(&text) {
            Ok(manifest) => ParsedManifest::Parsed(manifest),
            Err(e) => ParsedManifest::Invalid(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    #[test]
    fn test_is_git_repository() {
        let dir = TempDir::new().unwrap();

        // Initially not a Git repository
        assert!(!is_git_repository(dir.path()));

        // After git init, it becomes a Git repository
        Command::new("git")
            .args(["init"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        assert!(is_git_repository(dir.path()));
    }

    #[test]
    fn test_git_file_is_not_a_repository() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".git"), "gitdir: ../.git/modules/x").unwrap();
        assert!(!is_git_repository(dir.path()));
    }

    #[test]
    fn test_list_candidates_skips_files() {
        let base = TempDir::new().unwrap();
        fs::create_dir(base.path().join("repo_a")).unwrap();
        fs::create_dir(base.path().join("repo_b")).unwrap();
        fs::create_dir_all(base.path().join("repo_b").join("nested")).unwrap();
        fs::write(base.path().join("notes.txt"), "x").unwrap();

        let mut names: Vec<String> = list_candidates(base.path())
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["repo_a", "repo_b"]);
    }

    #[test]
    fn test_list_candidates_missing_parent() {
        let base = TempDir::new().unwrap();
        let missing = base.path().join("gone");
        assert!(matches!(
            list_candidates(&missing),
            Err(Error::ParentNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn test_manifest_declares_dev_dependency() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST),
            r#"{"name":"c","devDependencies":{"lodash":"^4.17.21"}}"#,
        )
        .unwrap();

        assert!(has_manifest(dir.path()));
        match ParsedManifest::load(dir.path()) {
            ParsedManifest::Parsed(m) => {
                assert!(m.declares("lodash"));
                assert!(!m.declares("react"));
            }
            ParsedManifest::Invalid(e) => panic!("unexpected parse error: {}", e),
        }
    }

    #[test]
    fn test_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST), "{ not json").unwrap();
        assert!(matches!(
            ParsedManifest::load(dir.path()),
            ParsedManifest::Invalid(_)
        ));
    }
}
