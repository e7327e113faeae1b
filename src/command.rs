use serde::{Deserialize, Serialize};
use std::fmt;

/// Conventional process exit code type used by this crate.
///
/// Non-negative values are real process exit statuses. The engine reserves
/// [`EXIT_REJECTED`] and [`EXIT_SPAWN_FAILED`] for outcomes where no process ran
/// to completion.
pub type ExitCode = i32;

/// The command was refused before any process was spawned.
pub const EXIT_REJECTED: ExitCode = -1;

/// The process could not be started, or did not finish normally (e.g. timeout).
pub const EXIT_SPAWN_FAILED: ExitCode = -2;

/// One instructor-authored command template.
///
/// The template may reference positional arguments as `$1`, `$2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(rename = "Command")]
    pub command: String,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// The part of a lesson this engine consumes: its ordered command templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDefinition {
    #[serde(rename = "Commands", default)]
    pub commands: Vec<CommandSpec>,
}

impl LessonDefinition {
    pub fn new(commands: impl IntoIterator<Item = CommandSpec>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }
}

/// Why a command was refused before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The interpolated template was empty or whitespace only.
    InvalidCommand,
    /// The command name is not a key of the whitelist.
    CommandNotAllowed,
    /// An argument is outside the command's allow-set, or is empty.
    InvalidArguments,
}

impl Rejection {
    /// Human-readable reason reported in [`CliCommandResult::stdout`].
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::InvalidCommand => "Invalid command",
            Rejection::CommandNotAllowed => "Command not allowed",
            Rejection::InvalidArguments => "Invalid arguments",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a single command check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Rejected(Rejection),
    /// The process ran to completion; `output` is the trimmed combined stream.
    Executed { code: ExitCode, output: String },
    /// The process could not be started or was abandoned.
    SpawnFailed(String),
}

impl CommandOutcome {
    /// Project this outcome into the externally visible result record.
    pub fn into_result(self, final_command: String) -> CliCommandResult {
        let (exit_code, stdout) = match self {
            CommandOutcome::Rejected(reason) => (EXIT_REJECTED, reason.as_str().to_string()),
            CommandOutcome::Executed { code, output } => (code, output),
            CommandOutcome::SpawnFailed(_) => (EXIT_SPAWN_FAILED, String::new()),
        };
        CliCommandResult {
            final_command,
            exit_code,
            stdout,
        }
    }
}

/// What an [`Executor`] reports for a program it was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The program ran and exited with `code`, possibly non-zero.
    Exited { code: ExitCode, output: String },
    /// The program could not be started, or was killed before finishing.
    SpawnFailed(String),
}

impl From<ExecOutcome> for CommandOutcome {
    fn from(outcome: ExecOutcome) -> Self {
        match outcome {
            ExecOutcome::Exited { code, output } => CommandOutcome::Executed { code, output },
            ExecOutcome::SpawnFailed(reason) => CommandOutcome::SpawnFailed(reason),
        }
    }
}

/// Runs an already admitted command.
///
/// Implementations receive the program name and its arguments as separate
/// values and must keep them separate: nothing is joined back into a command
/// line or handed to a shell.
pub trait Executor {
    fn execute(&self, name: &str, argv: &[String]) -> ExecOutcome;
}

/// Decode captured output and strip trailing spaces, tabs, and line breaks.
///
/// Leading and interior whitespace is preserved.
pub fn trim_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches([' ', '\n', '\t', '\r'])
        .to_string()
}

/// What ran and what happened, as submitted back to the grading service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliCommandResult {
    /// The interpolated command, set even when the command was rejected.
    #[serde(rename = "FinalCommand")]
    pub final_command: String,
    #[serde(rename = "ExitCode")]
    pub exit_code: ExitCode,
    #[serde(rename = "Stdout")]
    pub stdout: String,
}
