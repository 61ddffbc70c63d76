use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a batch before any repository is touched, plus the
/// tool failures a step can raise.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Directory '{}' not found", .0.display())]
    ParentNotFound(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("No subdirectories found in '{}'", .0.display())]
    NoSubdirectories(PathBuf),

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("Source folder '{}' does not exist or is not a directory", .0.display())]
    SourceNotDirectory(PathBuf),

    /// A must-succeed command exited non-zero.
    #[error("{command} exited with code {code}: {stderr}")]
    ToolFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The command could not be started at all (missing binary, bad cwd).
    #[error("failed to run {command}")]
    ToolSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
