//! Process execution seam
//!
//! Runs one command line through the shell and captures everything it wrote.
//! Benchmark commands may chain (`./miniFE.x ... && cat $(ls -t *.yaml | head -n 1)`),
//! so they are handed to `sh -c` whole rather than split into argv.

use std::process::Command;

/// Captured result of one process invocation
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Whether the process exited with status zero
    pub success: bool,
    /// Exit code if the process exited normally
    pub exit_code: Option<i32>,
    /// Raw stdout
    pub stdout: String,
    /// Raw stderr
    pub stderr: String,
}

impl ProcessOutput {
    /// Successful output with the given stdout, for scripted executors
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout followed by stderr, the text patterns are matched against
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len());
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }
}

/// Something that can run a command line to completion
pub trait CommandExecutor {
    /// Run `command_line` in the current working directory and wait for it.
    ///
    /// `Err` means the process could not be started at all; a process that
    /// ran and failed is `Ok` with `success == false`.
    fn execute(&self, command_line: &str) -> std::io::Result<ProcessOutput>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, command_line: &str) -> std::io::Result<ProcessOutput> {
        (**self).execute(command_line)
    }
}

/// Executor that runs command lines through a POSIX shell
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Use a different shell binary (must accept `-c <command>`)
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command_line: &str) -> std::io::Result<ProcessOutput> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .output()?;

        Ok(ProcessOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
