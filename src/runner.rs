use std::process::{Command, Output};

/// Captured result of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, 1 when the command never started
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Result standing in for a command that could not be launched
    pub fn launch_failure(error: impl std::fmt::Display) -> Self {
        Self {
            code: 1,
            stdout: String::new(),
            stderr: error.to_string(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Most useful single message: stderr, else stdout
    pub fn message(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() { self.stdout.trim() } else { stderr }
    }

    /// Stdout and stderr joined
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr).trim().to_string()
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Runs external commands to completion
pub trait CommandRunner {
    /// Executes `program` with `args`, never failing: launch errors become a failed output
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput;
}

/// Runner that spawns real processes
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        tracing::debug!("running {} {}", program, args.join(" "));
        match Command::new(program).args(args).output() {
            Ok(output) => output.into(),
            Err(err) => CommandOutput::launch_failure(err),
        }
    }
}
