use crate::command::{ExecOutcome, Executor, ExitCode, trim_output};
use crate::env::Environment;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs admitted commands as real child processes.
///
/// The program is resolved through the `PATH` of the executor's [`Environment`]
/// and started with the argument vector exactly as given. Standard output and
/// standard error share one pipe, so the captured text keeps the order in which
/// the child wrote it. Standard input is closed.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    env: Environment,
    timeout: Option<Duration>,
}

enum Completion {
    Finished { status: ExitStatus, output: Vec<u8> },
    TimedOut,
}

impl ProcessExecutor {
    pub fn new(env: Environment) -> Self {
        Self { env, timeout: None }
    }

    /// Kill any command still running after `timeout` and report it as a spawn failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn spawn_and_wait(&self, program: &Path, argv: &[String]) -> io::Result<Completion> {
        let (mut reader, writer) = io::pipe()?;
        let mut cmd = Command::new(program);
        cmd.args(argv)
            .env_clear()
            .envs(self.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.env.current_dir)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);
        let mut child = cmd.spawn()?;
        // The command still owns our copies of the write end; without this drop
        // the reader never sees EOF.
        drop(cmd);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let res = reader.read_to_end(&mut buf).map(|_| buf);
            // The receiver is gone once the deadline passed; nothing left to report to.
            let _ = tx.send(res);
        });

        let Some(deadline) = self.timeout.map(|limit| Instant::now() + limit) else {
            let status = child.wait()?;
            let output = rx
                .recv()
                .map_err(|_| io::Error::other("output collector stopped"))??;
            return Ok(Completion::Finished { status, output });
        };

        let Some(status) = wait_with_deadline(&mut child, deadline)? else {
            // Best effort: the child may have exited between the last poll and the kill.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(Completion::TimedOut);
        };

        // A background process left behind by the child can hold the pipe open.
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(output) => Ok(Completion::Finished {
                status,
                output: output?,
            }),
            Err(RecvTimeoutError::Timeout) => Ok(Completion::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::other("output collector stopped")),
        }
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(Environment::new())
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, name: &str, argv: &[String]) -> ExecOutcome {
        let search_paths = self.env.get_var("PATH").unwrap_or_default();
        let Some(program) = find_command_path(
            OsStr::new(search_paths),
            &self.env.current_dir,
            Path::new(name),
        ) else {
            warn!(command = name, "executable not found");
            return ExecOutcome::SpawnFailed("command not found".to_string());
        };

        debug!(program = %program.display(), ?argv, "spawning");
        match self.spawn_and_wait(&program, argv) {
            Ok(Completion::Finished { status, output }) => ExecOutcome::Exited {
                code: exit_code(status),
                output: trim_output(&output),
            },
            Ok(Completion::TimedOut) => {
                warn!(command = name, timeout = ?self.timeout, "command timed out and was killed");
                ExecOutcome::SpawnFailed("timeout".to_string())
            }
            Err(e) => {
                warn!(command = name, error = %e, "failed to run command");
                ExecOutcome::SpawnFailed(e.to_string())
            }
        }
    }
}

fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else {
        255
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    255
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo`, or any relative path with several components (e.g. `bin/tool`):
///   resolved against `current_dir`, returned if it exists.
/// - Single path component: search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    current_dir: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        // Single component -> search in PATH
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => {
            let candidate = current_dir.join(path);
            candidate.exists().then_some(Cow::Owned(candidate))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

/// A regular file the current user may execute. Directories and plain data files
/// sharing the command's name are skipped so the PATH search moves on.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
