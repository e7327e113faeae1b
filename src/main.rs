use anyhow::{Context, Result};
use argh::FromArgs;
use lesson_check::{CheckConfig, ExecutorMode, LessonDefinition};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Run a lesson's command checks and print the results as JSON.
struct Args {
    #[argh(option)]
    /// lesson definition file (JSON with a "Commands" array).
    lesson: PathBuf,

    #[argh(option)]
    /// TOML file with [executor] and [policy] tables.
    config: Option<PathBuf>,

    #[argh(switch)]
    /// answer commands in-process instead of spawning them.
    simulate: bool,

    #[argh(option)]
    /// kill any command still running after this many seconds.
    timeout: Option<u64>,

    #[argh(switch, short = 'v')]
    /// log every step to stderr.
    verbose: bool,

    #[argh(positional, greedy)]
    /// values substituted for $1, $2, ... in the lesson's commands.
    args: Vec<String>,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => CheckConfig::from_file(path)?,
        None => CheckConfig::default(),
    };
    if args.simulate {
        config.executor.mode = ExecutorMode::Simulated;
    }
    if let Some(secs) = args.timeout {
        config.executor.timeout_secs = Some(secs);
    }
    config.validate()?;

    let text = std::fs::read_to_string(&args.lesson)
        .with_context(|| format!("can't read lesson {}", args.lesson.display()))?;
    let lesson: LessonDefinition = serde_json::from_str(&text)
        .with_context(|| format!("can't parse lesson {}", args.lesson.display()))?;

    let results = config.checker().run(&lesson, args.args.as_slice());
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
