use crate::command::{CliCommandResult, CommandOutcome, CommandSpec, Executor, LessonDefinition, Rejection};
use crate::external::ProcessExecutor;
use crate::interpolate::{interpolate, unresolved_placeholders};
use crate::lexer::split_into_tokens;
use crate::policy::{Admission, WhitelistPolicy};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Runs the command checks of a lesson.
///
/// Each command template is interpolated with the caller's positional arguments,
/// split into a name and argv, checked against the [`WhitelistPolicy`], and only
/// then handed to the [`Executor`]. Commands run one after another in lesson
/// order, because a later check may depend on what an earlier one did.
///
/// Example
/// ```
/// use lesson_check::{Checker, CommandSpec, LessonDefinition, SimulatedExecutor, WhitelistPolicy};
///
/// let policy = WhitelistPolicy::builder().allow_any("echo").build();
/// let checker = Checker::new(policy, Box::new(SimulatedExecutor::default()));
/// let lesson = LessonDefinition::new([CommandSpec::new("echo $1 $2")]);
///
/// let results = checker.run(&lesson, &["a", "b"]);
/// assert_eq!(results[0].final_command, "echo a b");
/// assert_eq!(results[0].exit_code, 0);
/// assert_eq!(results[0].stdout, "a b");
/// ```
pub struct Checker {
    policy: Arc<WhitelistPolicy>,
    executor: Box<dyn Executor>,
}

impl Checker {
    pub fn new(policy: impl Into<Arc<WhitelistPolicy>>, executor: Box<dyn Executor>) -> Self {
        Self {
            policy: policy.into(),
            executor,
        }
    }

    pub fn policy(&self) -> &WhitelistPolicy {
        &self.policy
    }

    /// Check every command of `lesson`; see [`Checker::run_commands`].
    pub fn run<S: AsRef<str>>(&self, lesson: &LessonDefinition, args: &[S]) -> Vec<CliCommandResult> {
        self.run_commands(&lesson.commands, args)
    }

    /// Check `commands` in order and return one result per command, in the same order.
    ///
    /// A rejected or failed command never stops the batch.
    pub fn run_commands<S: AsRef<str>>(
        &self,
        commands: &[CommandSpec],
        args: &[S],
    ) -> Vec<CliCommandResult> {
        commands
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let span = info_span!("command", index);
                let _guard = span.enter();
                self.check_command(spec, args)
            })
            .collect()
    }

    /// Interpolate, admit and run a single command.
    pub fn check_command<S: AsRef<str>>(&self, spec: &CommandSpec, args: &[S]) -> CliCommandResult {
        let final_command = interpolate(&spec.command, args);
        let unresolved = unresolved_placeholders(&final_command);
        if !unresolved.is_empty() {
            warn!(
                command = %final_command,
                placeholders = ?unresolved,
                supplied = args.len(),
                "placeholders left without a positional argument"
            );
        }
        self.evaluate(&final_command).into_result(final_command)
    }

    /// Decide the outcome of an already interpolated command line.
    pub fn evaluate(&self, final_command: &str) -> CommandOutcome {
        let tokens = split_into_tokens(final_command);
        if tokens.is_empty() {
            warn!("blank command");
            return CommandOutcome::Rejected(Rejection::InvalidCommand);
        }
        debug!(name = %tokens.name, argv = ?tokens.argv, "tokenized");

        if let Admission::Rejected(reason) = self.policy.admit(&tokens.name, tokens.argv.as_slice()) {
            warn!(name = %tokens.name, argv = ?tokens.argv, %reason, "command rejected");
            return CommandOutcome::Rejected(reason);
        }

        let outcome = CommandOutcome::from(self.executor.execute(&tokens.name, &tokens.argv));
        match &outcome {
            CommandOutcome::Executed { code, .. } => info!(name = %tokens.name, code, "command finished"),
            CommandOutcome::SpawnFailed(reason) => warn!(name = %tokens.name, %reason, "command did not run"),
            CommandOutcome::Rejected(_) => {}
        }
        outcome
    }
}

impl Default for Checker {
    /// The built-in policy with real process execution in the current directory.
    fn default() -> Self {
        Self::new(WhitelistPolicy::default(), Box::new(ProcessExecutor::default()))
    }
}
