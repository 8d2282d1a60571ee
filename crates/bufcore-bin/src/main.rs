use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, Result};
use clap::Parser;
use core_state::{UndoLimits, UndoLog};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod script;

use script::Session;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "bufcore", version, about = "Replay an edit script against the buffer engine")]
struct Args {
    /// Script to replay, one command per line.
    pub script: PathBuf,
    /// Optional configuration file path (overrides discovery of `bufcore.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("bufcore.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "bufcore.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; dropping the guard shuts the writer down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Limits from the `[undo]` table. A single command larger than the outer
/// limit has its whole history discarded, with a warning.
fn undo_limits(config: &core_config::Config) -> Result<UndoLimits> {
    let mut limits = UndoLimits::from_config(config.undo()).context("invalid [undo] limits")?;
    limits.set_outer_limit_handler(|log: &mut UndoLog, size| {
        warn!(
            target: "state.undo",
            size,
            "undo_outer_limit_exceeded_discarding_history"
        );
        log.clear();
        true
    });
    Ok(limits)
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();

    let args = Args::parse();
    info!(target: "runtime", script = %args.script.display(), "startup");

    let config = core_config::load_from(args.config.clone())?;
    let limits = undo_limits(&config)?;
    let source = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;

    let stdout = std::io::stdout();
    let mut session = Session::new(limits, stdout.lock());
    let result = session.run(&source);
    match &result {
        Ok(()) => info!(target: "runtime", "shutdown"),
        Err(e) => error!(target: "runtime", error = %format!("{e:#}"), "script_failed"),
    }
    result
}
