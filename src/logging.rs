use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use chrono::Local;
use tracing::info;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    prelude::*,
};

use crate::{config::Config, error::AppError};

/// Environment variable holding the log filter
const LOG_LEVEL_ENV: &str = "WINMAINT_LOG";
/// Cross-run log file, kept beside the executable
const PERSISTENT_LOG_PREFIX: &str = "winmaint";
const LOG_SUFFIX: &str = "log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-run log path of the subscriber installed by this process
static ACTIVE_RUN_LOG: OnceLock<PathBuf> = OnceLock::new();

/// Keeps the file writers alive; dropping it flushes and closes them
pub struct LogHandle {
    pub run_log: PathBuf,
    _guards: Vec<WorkerGuard>,
}

/// Local wall-clock timestamps for the file sinks
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format(TIMESTAMP_FORMAT))
    }
}

/// Sets up console, persistent and per-run logging
pub fn init_logging(config: &Config) -> Result<LogHandle, AppError> {
    init_logging_in(&executable_dir(), &config.log_dir)
}

/// Sets up logging with explicit directories; later calls are no-ops
pub fn init_logging_in(persistent_dir: &Path, run_dir: &Path) -> Result<LogHandle, AppError> {
    if let Some(run_log) = ACTIVE_RUN_LOG.get() {
        return Ok(LogHandle {
            run_log: run_log.clone(),
            _guards: Vec::new(),
        });
    }

    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let persistent_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(PERSISTENT_LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX)
        .build(persistent_dir)?;

    fs::create_dir_all(run_dir)?;
    let run_name = format!("run_{}", Local::now().format("%Y%m%d_%H%M%S"));
    let run_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&run_name)
        .filename_suffix(LOG_SUFFIX)
        .build(run_dir)?;
    let run_log = run_dir.join(format!("{}.{}", run_name, LOG_SUFFIX));

    let (persistent_writer, persistent_guard) = tracing_appender::non_blocking(persistent_appender);
    let (run_writer, run_guard) = tracing_appender::non_blocking(run_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .without_time()
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(persistent_writer)
                .with_timer(LocalTimer)
                .with_target(false)
                .with_ansi(false),
        )
        .with(
            fmt::layer()
                .with_writer(run_writer)
                .with_timer(LocalTimer)
                .with_target(false)
                .with_ansi(false),
        )
        .with(filter)
        .try_init()?;

    let run_log = ACTIVE_RUN_LOG.get_or_init(|| run_log).clone();
    info!("Logging enabled. Log file: {}", run_log.display());

    Ok(LogHandle {
        run_log,
        _guards: vec![persistent_guard, run_guard],
    })
}

/// Directory holding the running executable
fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
