use crate::command::{ExecOutcome, Executor, ExitCode, trim_output};
use crate::env::Environment;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Commands the [`SimulatedExecutor`] can answer in-process.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// without spawning a child process. Relative paths are resolved against the
/// executor's working directory, never the process's.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "ls".
    fn name() -> &'static str;

    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode>;
}

/// Executor that never starts a process.
///
/// It understands `echo`, `cat`, `ls`, `pwd` and `wc`, with a small subset of
/// their flags. Any other name is reported as a spawn failure, just as a missing
/// binary would be. Useful for dry runs and for tests that must not depend on
/// the host's coreutils.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    env: Environment,
}

impl SimulatedExecutor {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Names this executor can run.
    pub fn supported() -> &'static [&'static str] {
        &["echo", "cat", "ls", "pwd", "wc"]
    }

    fn run<T: BuiltinCommand>(&self, argv: &[String]) -> ExecOutcome {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        let mut out = Vec::new();
        let code = match T::from_args(&[T::name()], &args) {
            Ok(cmd) => match cmd.execute(&mut out, &self.env) {
                Ok(code) => code,
                Err(e) => {
                    out.extend_from_slice(e.to_string().as_bytes());
                    1
                }
            },
            Err(EarlyExit { output, status }) => {
                out.extend_from_slice(output.as_bytes());
                if status.is_err() { 1 } else { 0 }
            }
        };
        ExecOutcome::Exited {
            code,
            output: trim_output(&out),
        }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(Environment::new())
    }
}

impl Executor for SimulatedExecutor {
    fn execute(&self, name: &str, argv: &[String]) -> ExecOutcome {
        debug!(command = name, ?argv, "simulating");
        match name {
            "echo" => {
                let mut out = Vec::new();
                match Echo::parse(argv).execute(&mut out) {
                    Ok(code) => ExecOutcome::Exited {
                        code,
                        output: trim_output(&out),
                    },
                    Err(e) => ExecOutcome::SpawnFailed(e.to_string()),
                }
            }
            "cat" => self.run::<Cat>(argv),
            "ls" => self.run::<Ls>(argv),
            "pwd" => self.run::<Pwd>(argv),
            "wc" => self.run::<Wc>(argv),
            _ => ExecOutcome::SpawnFailed("command not found".to_string()),
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
///
/// Not parsed with argh: like `/bin/echo`, every operand that is not a leading
/// `-n`/`-e`/`-E` style option is printed as-is, dashes included.
pub struct Echo {
    pub no_newline: bool,
    pub args: Vec<String>,
}

impl Echo {
    pub fn parse(argv: &[String]) -> Self {
        let mut no_newline = false;
        let mut operands = argv;
        while let Some((first, rest)) = operands.split_first() {
            let Some(flags) = first.strip_prefix('-') else {
                break;
            };
            if flags.is_empty() || !flags.chars().all(|c| matches!(c, 'n' | 'e' | 'E')) {
                break;
            }
            no_newline |= flags.contains('n');
            operands = rest;
        }
        Self {
            no_newline,
            args: operands.to_vec(),
        }
    }

    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print file(s) to stdout
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print, in order.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        let mut code = 0;
        for fname in &self.files {
            match fs::read(env.current_dir.join(fname)) {
                Ok(bytes) => stdout.write_all(&bytes)?,
                Err(e) => {
                    writeln!(stdout, "cat: {}: {}", fname, e)?;
                    code = 1;
                }
            }
        }
        Ok(code)
    }
}

#[derive(FromArgs)]
/// count lines, words and bytes
pub struct Wc {
    #[argh(positional, greedy)]
    /// files to count.
    pub files: Vec<String>,
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        for fname in &self.files {
            let s = fs::read_to_string(env.current_dir.join(fname))
                .with_context(|| format!("wc: {}", fname))?;
            let lines = s.lines().count();
            let words = s.split_whitespace().count();
            let bytes = s.len();
            writeln!(stdout, "{} {} {} {}", lines, words, bytes, fname)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// list directory contents
pub struct Ls {
    #[argh(switch, short = 'l')]
    /// one entry per line with type and size.
    pub long: bool,

    #[argh(switch, short = 'a')]
    /// include entries starting with '.'.
    pub all: bool,

    #[argh(positional, greedy)]
    /// paths to list; defaults to the working directory.
    pub paths: Vec<String>,
}

impl Ls {
    fn entry_line(&self, path: &Path, name: &str) -> Result<String> {
        if !self.long {
            return Ok(name.to_string());
        }
        let meta = fs::metadata(path).with_context(|| format!("ls: {}", name))?;
        let kind = if meta.is_dir() { 'd' } else { '-' };
        Ok(format!("{} {:>8} {}", kind, meta.len(), name))
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names: Vec<String> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<_>>()?;
        names.retain(|n| self.all || !n.starts_with('.'));
        names.sort();
        if self.all {
            names.insert(0, "..".to_string());
            names.insert(0, ".".to_string());
        }
        names
            .iter()
            .map(|n| self.entry_line(&dir.join(n), n))
            .collect()
    }
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(self, stdout: &mut dyn Write, env: &Environment) -> Result<ExitCode> {
        let paths = if self.paths.is_empty() {
            vec![".".to_string()]
        } else {
            self.paths.clone()
        };
        let with_headers = paths.len() > 1;
        let mut code = 0;
        for p in &paths {
            let full = env.current_dir.join(p);
            if full.is_dir() {
                if with_headers {
                    writeln!(stdout, "{}:", p)?;
                }
                for line in self.list_dir(&full)? {
                    writeln!(stdout, "{}", line)?;
                }
            } else if full.exists() {
                writeln!(stdout, "{}", self.entry_line(&full, p)?)?;
            } else {
                writeln!(stdout, "ls: cannot access '{}': No such file or directory", p)?;
                code = 2;
            }
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_in(dir: &Path) -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: dir.to_path_buf(),
        }
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn exited(code: ExitCode, output: &str) -> ExecOutcome {
        ExecOutcome::Exited {
            code,
            output: output.to_string(),
        }
    }

    #[test]
    fn test_pwd_prints_working_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        Pwd {}.execute(&mut out, &env_in(tmp.path())).unwrap();
        let expected = format!("{}\n", tmp.path().to_string_lossy());
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_echo_with_and_without_newline() {
        let mut out1 = Vec::new();
        let echo1 = Echo {
            no_newline: false,
            args: args(&["hello", "world"]),
        };
        assert!(echo1.execute(&mut out1).is_ok());
        assert_eq!(String::from_utf8(out1).unwrap(), "hello world\n");

        let mut out2 = Vec::new();
        let echo2 = Echo {
            no_newline: true,
            args: args(&["foo", "bar"]),
        };
        assert!(echo2.execute(&mut out2).is_ok());
        assert_eq!(String::from_utf8(out2).unwrap(), "foo bar");
    }

    #[test]
    fn test_simulated_echo() {
        let exec = SimulatedExecutor::new(env_in(Path::new("/")));
        assert_eq!(exec.execute("echo", &args(&["a", "b"])), exited(0, "a b"));
        assert_eq!(exec.execute("echo", &args(&["-n", "x"])), exited(0, "x"));
    }

    #[test]
    fn test_echo_prints_dash_operands() {
        let exec = SimulatedExecutor::new(env_in(Path::new("/")));
        assert_eq!(exec.execute("echo", &args(&["-x"])), exited(0, "-x"));
        assert_eq!(exec.execute("echo", &args(&["--help"])), exited(0, "--help"));
        assert_eq!(exec.execute("echo", &args(&["a", "-n"])), exited(0, "a -n"));
        assert_eq!(exec.execute("echo", &args(&["-"])), exited(0, "-"));
    }

    #[test]
    fn test_echo_parse_leading_options_only() {
        let echo = Echo::parse(&args(&["-n", "-e", "-nx", "b"]));
        assert!(echo.no_newline);
        assert_eq!(echo.args, args(&["-nx", "b"]));
    }

    #[test]
    fn test_cat_reads_relative_to_working_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("notes.txt"), "line one\nline two\n\n").unwrap();
        let exec = SimulatedExecutor::new(env_in(tmp.path()));
        assert_eq!(
            exec.execute("cat", &args(&["notes.txt"])),
            exited(0, "line one\nline two")
        );
    }

    #[test]
    fn test_cat_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = SimulatedExecutor::new(env_in(tmp.path()));
        match exec.execute("cat", &args(&["nope.txt"])) {
            ExecOutcome::Exited { code, output } => {
                assert_eq!(code, 1);
                assert!(output.starts_with("cat: nope.txt:"), "got {output:?}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_wc_counts_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "one two\nthree\n").unwrap();
        let exec = SimulatedExecutor::new(env_in(tmp.path()));
        assert_eq!(
            exec.execute("wc", &args(&["a.txt"])),
            exited(0, "2 3 14 a.txt")
        );
    }

    #[test]
    fn test_ls_lists_sorted_and_hides_dotfiles() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), "").unwrap();
        fs::write(tmp.path().join("a.txt"), "").unwrap();
        fs::write(tmp.path().join(".hidden"), "").unwrap();
        let exec = SimulatedExecutor::new(env_in(tmp.path()));

        assert_eq!(exec.execute("ls", &[]), exited(0, "a.txt\nb.txt"));
        assert_eq!(
            exec.execute("ls", &args(&["-a"])),
            exited(0, ".\n..\n.hidden\na.txt\nb.txt")
        );
    }

    #[test]
    fn test_ls_long_and_missing_path() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("data.bin"), "12345").unwrap();
        let exec = SimulatedExecutor::new(env_in(tmp.path()));

        assert_eq!(
            exec.execute("ls", &args(&["-l"])),
            exited(0, "-        5 data.bin")
        );
        assert_eq!(
            exec.execute("ls", &args(&["missing"])),
            exited(2, "ls: cannot access 'missing': No such file or directory")
        );
    }

    #[test]
    fn test_unknown_flag_is_command_error() {
        let exec = SimulatedExecutor::new(env_in(Path::new("/")));
        assert!(matches!(
            exec.execute("ls", &args(&["-z"])),
            ExecOutcome::Exited { code: 1, .. }
        ));
    }

    #[test]
    fn test_unknown_command_is_spawn_failure() {
        let exec = SimulatedExecutor::new(env_in(Path::new("/")));
        assert_eq!(
            exec.execute("rm", &args(&["-rf", "/"])),
            ExecOutcome::SpawnFailed("command not found".to_string())
        );
        assert!(!SimulatedExecutor::supported().contains(&"rm"));
    }
}
