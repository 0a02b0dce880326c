use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error during file I/O operations
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    /// Error when user input fails.
    #[error("inquire error: {0}")]
    Inquire(#[from] inquire::InquireError),
    /// Error when a log file appender cannot be opened
    #[error("log file error: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),
    /// Error when the global log subscriber cannot be installed
    #[error("logging init error: {0}")]
    LogInit(#[from] tracing_subscriber::util::TryInitError),
    /// Error when exporting a registry key to a backup file
    #[error("registry export failed: {0}")]
    RegistryExport(String),
    /// Error when the process cannot obtain administrator rights
    #[error("elevation failed: {0}")]
    Elevation(String),
    /// Error during configuration validation.
    #[error("validation error: {0}")]
    Validation(String),
}
