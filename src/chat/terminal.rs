//! Running the model's terminal commands.

use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use crate::observability::{TERMINAL_COMMANDS, TERMINAL_DURATION, TERMINAL_SPAWN_ERRORS};

/// Prefix of the system message that carries terminal output back to the model.
pub const TERMINAL_TAG: &str = "[TERMINAL] ";

/// Program used to interpret commands when none is configured.
pub const DEFAULT_SHELL_PROGRAM: &str = "sh";

/// What a command wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalOutput {
    /// Everything written to standard output, decoded lossily.
    pub stdout: String,
    /// Everything written to standard error, decoded lossily.
    pub stderr: String,
}

impl TerminalOutput {
    /// Standard output followed by standard error, the latter set off by one
    /// space.  Either part is omitted when empty.
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            combined.push(' ');
            combined.push_str(&self.stderr);
        }
        combined
    }

    /// True when there is nothing worth echoing.
    pub fn is_blank(&self) -> bool {
        self.combined().trim().is_empty()
    }

    /// The system message reporting this output to the model.
    pub fn to_message(&self) -> String {
        format!("{TERMINAL_TAG}{}", self.combined())
    }
}

/// Runs command strings through a shell, one at a time.
#[derive(Debug, Clone)]
pub struct TerminalExecutor {
    program: String,
    inherit_stdin: bool,
}

impl TerminalExecutor {
    /// An executor that runs commands with `program -c <command>`.
    ///
    /// Commands share the user's standard input, so `sudo` and friends can
    /// still prompt.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            inherit_stdin: true,
        }
    }

    /// Give commands a closed standard input instead of the user's.
    pub fn with_closed_stdin(mut self) -> Self {
        self.inherit_stdin = false;
        self
    }

    fn stdin(&self) -> Stdio {
        if self.inherit_stdin {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }

    /// Run `command` to completion and capture what it wrote.
    ///
    /// The exit status is not inspected; a failing command is reported only
    /// through its output.  If the shell itself cannot be started, the reason
    /// is reported as standard error.
    pub async fn run(&self, command: &str) -> TerminalOutput {
        TERMINAL_COMMANDS.click();
        let started = Instant::now();
        let output = Command::new(&self.program)
            .arg("-c")
            .arg(command)
            .stdin(self.stdin())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;
        TERMINAL_DURATION.add(started.elapsed().as_secs_f64());
        match output {
            Ok(output) => TerminalOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(err) => {
                TERMINAL_SPAWN_ERRORS.click();
                TerminalOutput {
                    stdout: String::new(),
                    stderr: format!("failed to start {}: {err}", self.program),
                }
            }
        }
    }
}

impl Default for TerminalExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL_PROGRAM)
    }
}
