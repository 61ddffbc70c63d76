use crate::error::{Error, Result};
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A single external command bound to the directory it runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
    pub envs: Vec<(String, String)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, dir: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: dir.to_path_buf(),
            envs: Vec::new(),
        }
    }

    pub fn git(dir: &Path) -> Self {
        Self::new("git", dir)
    }

    pub fn npm(dir: &Path) -> Self {
        Self::new("npm", dir)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs external tools. A non-zero exit is data, not an error, unless the
/// caller goes through `run_checked`.
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;

    /// Find `program` on `PATH`
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    /// Must-succeed mode: a non-zero exit becomes `Error::ToolFailed`
    fn run_checked(&self, command: &ToolCommand) -> Result<ToolOutput> {
        let output = self.run(command)?;
        if !output.success() {
            return Err(Error::ToolFailed {
                command: command.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Spawns real processes, one at a time, in the command's own directory
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        debug!("running `{}` in {}", command, command.dir.display());

        let output = Command::new(&command.program)
            .args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&command.dir)
            .output()
            .map_err(|source| Error::ToolSpawn {
                command: command.to_string(),
                source,
            })?;

        // Killed by a signal
        let code = output.status.code().unwrap_or(-1);
        debug!("`{}` exited with {}", command, code);

        Ok(ToolOutput {
            code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    type Matcher = Box<dyn Fn(&ToolCommand) -> bool>;

    /// In-memory runner: records every command and answers from canned rules.
    /// Unmatched commands succeed with empty output.
    #[derive(Default)]
    pub struct ScriptedRunner {
        calls: RefCell<Vec<ToolCommand>>,
        rules: Vec<(Matcher, ToolOutput)>,
        raises: Vec<Matcher>,
        programs: Vec<String>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(
            mut self,
            matcher: impl Fn(&ToolCommand) -> bool + 'static,
            output: ToolOutput,
        ) -> Self {
            self.rules.push((Box::new(matcher), output));
            self
        }

        /// Answer `line` (program and args joined by spaces) with `output`
        pub fn on_line(self, line: &str, output: ToolOutput) -> Self {
            let line = line.to_string();
            self.on(move |c| c.to_string() == line, output)
        }

        /// Answer `line` only when it runs in a directory named `repo`
        pub fn on_line_in(self, repo: &str, line: &str, output: ToolOutput) -> Self {
            let line = line.to_string();
            let repo = repo.to_string();
            self.on(
                move |c| c.to_string() == line && c.dir.ends_with(&repo),
                output,
            )
        }

        /// Fail to start `line` in a directory named `repo`, as a missing binary would
        pub fn raise_in(mut self, repo: &str, line: &str) -> Self {
            let line = line.to_string();
            let repo = repo.to_string();
            self.raises
                .push(Box::new(move |c| c.to_string() == line && c.dir.ends_with(&repo)));
            self
        }

        pub fn with_program(mut self, program: &str) -> Self {
            self.programs.push(program.to_string());
            self
        }

        pub fn calls(&self) -> Vec<ToolCommand> {
            self.calls.borrow().clone()
        }

        pub fn lines(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.to_string()).collect()
        }

        pub fn lines_in(&self, repo: &str) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.dir.ends_with(repo))
                .map(|c| c.to_string())
                .collect()
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
            self.calls.borrow_mut().push(command.clone());
            if self.raises.iter().any(|matcher| matcher(command)) {
                return Err(Error::ToolSpawn {
                    command: command.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
            let output = self
                .rules
                .iter()
                .find(|(matcher, _)| matcher(command))
                .map(|(_, output)| output.clone())
                .unwrap_or_default();
            Ok(output)
        }

        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.programs
                .iter()
                .any(|p| p == program)
                .then(|| PathBuf::from("/usr/bin").join(program))
        }
    }

    pub fn ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: &str) -> ToolOutput {
        ToolOutput {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = ToolCommand::git(Path::new("/tmp")).args(["push", "origin", "--delete", "x"]);
        assert_eq!(cmd.to_string(), "git push origin --delete x");
    }

    #[test]
    fn test_system_runner_uses_command_directory() {
        let dir = TempDir::new().unwrap();
        Command::new("git")
            .args(["init"])
            .current_dir(dir.path())
            .output()
            .unwrap();

        let output = SystemRunner
            .run_checked(&ToolCommand::git(dir.path()).args(["status", "--porcelain"]))
            .unwrap();
        assert!(output.success());
        assert!(output.stdout.trim().is_empty());
    }

    #[test]
    fn test_run_checked_reports_stderr_on_non_zero_exit() {
        let dir = TempDir::new().unwrap();
        let cmd = ToolCommand::git(dir.path()).args(["rev-parse", "--verify", "refs/heads/nope"]);

        let output = SystemRunner.run(&cmd).unwrap();
        assert!(!output.success());

        match SystemRunner.run_checked(&cmd) {
            Err(Error::ToolFailed { command, code, .. }) => {
                assert_eq!(command, "git rev-parse --verify refs/heads/nope");
                assert_ne!(code, 0);
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let cmd = ToolCommand::new("repo-bulk-no-such-tool", dir.path());
        assert!(matches!(SystemRunner.run(&cmd), Err(Error::ToolSpawn { .. })));
    }
}
