mod codes;

pub use codes::ExitCode;

use crate::history::HistoryError;
use crate::rollback::RollbackError;
use crate::scanner::ScannerError;
use crate::session::SessionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Target directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Target directory is empty: {path}")]
    EmptyDirectory { path: PathBuf },

    #[error("History file error: {message}")]
    HistoryError {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("{failed} of {total} items could not be processed")]
    PartialFailure { failed: usize, total: usize },

    #[error("Cancelled after {completed} of {total} operations")]
    Cancelled { completed: usize, total: usize },

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::InvalidArgument { .. } => ExitCode::InvalidArguments,
            AppError::DirectoryNotFound { .. } => ExitCode::DirectoryNotFound,
            AppError::NotADirectory { .. } => ExitCode::DirectoryNotFound,
            AppError::PermissionDenied { .. } => ExitCode::PermissionError,
            AppError::EmptyDirectory { .. } => ExitCode::EmptyDirectory,
            AppError::HistoryError { .. } => ExitCode::HistoryError,
            AppError::PartialFailure { .. } => ExitCode::PartialFailure,
            AppError::Cancelled { .. } => ExitCode::Cancelled,
            AppError::Other(_) => ExitCode::GeneralError,
        }
    }

    pub fn detailed_message(&self) -> String {
        match self {
            AppError::InvalidArgument { message } => {
                format!("{}\n\nRun with --help for usage.", message)
            }

            AppError::DirectoryNotFound { path } => {
                format!(
                    "The specified directory does not exist:\n  {}\n\n\
                     Please verify the path and try again.",
                    path.display()
                )
            }

            AppError::NotADirectory { path } => {
                format!(
                    "The specified path is not a directory:\n  {}\n\n\
                     Please provide a valid directory path.",
                    path.display()
                )
            }

            AppError::PermissionDenied { path } => {
                format!(
                    "Permission denied when accessing:\n  {}\n\n\
                     Please check file permissions or run with appropriate privileges.",
                    path.display()
                )
            }

            AppError::EmptyDirectory { path } => {
                format!(
                    "The target directory has nothing to rename:\n  {}\n\n\
                     Hidden entries are skipped unless --include-hidden is given.",
                    path.display()
                )
            }

            AppError::HistoryError { path, message } => {
                let path_info = path
                    .as_ref()
                    .map(|p| format!("File: {}\n", p.display()))
                    .unwrap_or_default();

                format!(
                    "History file error:\n  {}\n{}\n\
                     Ensure the history file exists and is valid JSON.",
                    message, path_info
                )
            }

            AppError::PartialFailure { failed, total } => {
                format!(
                    "{} of {} items could not be processed.\n\n\
                     Completed renames were kept. Run with -v for per-item details.",
                    failed, total
                )
            }

            AppError::Cancelled { completed, total } => {
                format!(
                    "Interrupted after {} of {} operations.\n\n\
                     Completed renames were kept and can be reverted with --revert.",
                    completed, total
                )
            }

            AppError::Other(message) => message.clone(),
        }
    }
}

impl From<ScannerError> for AppError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::PathNotFound(path) => AppError::DirectoryNotFound { path },
            ScannerError::NotADirectory(path) => AppError::NotADirectory { path },
            ScannerError::PermissionDenied(path) => AppError::PermissionDenied { path },
            ScannerError::IoError(e) => AppError::Other(format!("I/O error: {}", e)),
            err @ ScannerError::InvalidPattern { .. } => AppError::InvalidArgument {
                message: err.to_string(),
            },
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Scan(e) => e.into(),
            SessionError::EmptyDirectory(path) => AppError::EmptyDirectory { path },
            other => AppError::Other(other.to_string()),
        }
    }
}

impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        AppError::HistoryError {
            path: None,
            message: err.to_string(),
        }
    }
}

impl From<RollbackError> for AppError {
    fn from(err: RollbackError) -> Self {
        match err {
            RollbackError::History(e) => e.into(),
        }
    }
}
