use colored::Colorize;
use fieldfill_core::BackfillError;
use std::fmt;
use std::process;

/// Exit codes for the CLI.
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Unified error type for CLI operations.
pub enum CliError {
    /// Configuration file or resolved settings are unusable.
    Config(String),
    /// Argument / usage errors.
    Usage(String),
    /// AWS client construction or table inspection failed.
    Storage(fieldfill_storage_aws::AwsStorageError),
    /// Store error outside a backfill run (e.g. `scan`).
    Store(fieldfill_core::StoreError),
    /// Fatal backfill error.
    Backfill(BackfillError),
    /// Bad file path, unreadable input.
    Input(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Usage(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Storage(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Store(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Backfill(e) => {
                write!(f, "{} {e}", "error:".red().bold())?;
                if let Some(progress) = e.progress().filter(|p| p.updated > 0) {
                    write!(
                        f,
                        "\n  {} {} record(s) were updated before the failure; re-run to finish",
                        "help:".cyan().bold(),
                        progress.updated
                    )?;
                }
                Ok(())
            }
            CliError::Input(msg) => write!(f, "{} {msg}", "error:".red().bold()),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<fieldfill_storage_aws::AwsStorageError> for CliError {
    fn from(e: fieldfill_storage_aws::AwsStorageError) -> Self {
        CliError::Storage(e)
    }
}

impl From<fieldfill_core::StoreError> for CliError {
    fn from(e: fieldfill_core::StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<BackfillError> for CliError {
    fn from(e: BackfillError) -> Self {
        match e {
            BackfillError::InvalidOptions(msg) => CliError::Usage(msg),
            other => CliError::Backfill(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Input(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Input(format!("JSON encode error: {e}"))
    }
}

/// Print error and exit with the appropriate code.
pub fn exit_with_error(err: CliError) -> ! {
    eprintln!("{err}");
    let code = match &err {
        CliError::Usage(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    };
    process::exit(code)
}

pub type CliResult<T> = std::result::Result<T, CliError>;
