//! Command-check engine for lesson verification.
//!
//! A lesson carries instructor-written command templates such as `cat $1` or
//! `ls -l`. The caller supplies positional arguments; this crate substitutes
//! them, checks the resulting command against a [`WhitelistPolicy`], runs the
//! admitted ones without a shell, and reports one [`CliCommandResult`] per
//! template, in order.
//!
//! The main entry point is [`Checker`]. Execution is pluggable through the
//! [`Executor`] trait: [`ProcessExecutor`] spawns real processes and
//! [`SimulatedExecutor`] answers a few common commands in-process. A
//! [`CheckConfig`] loaded from TOML wires a policy and an executor together.

mod builtin;
mod checker;
pub mod command;
pub mod config;
pub mod env;
mod external;
mod interpolate;
mod lexer;
pub mod policy;

pub use builtin::SimulatedExecutor;
pub use checker::Checker;
pub use command::{
    CliCommandResult, CommandOutcome, CommandSpec, EXIT_REJECTED, EXIT_SPAWN_FAILED, ExecOutcome,
    Executor, ExitCode, LessonDefinition, Rejection,
};
pub use config::{CheckConfig, ConfigError, ExecutorMode};
pub use external::{ProcessExecutor, find_command_path};
pub use interpolate::{interpolate, unresolved_placeholders};
pub use lexer::{Tokens, split_into_tokens};
pub use policy::{Admission, WhitelistPolicy};
