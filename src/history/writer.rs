use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::session::SessionResult;

use super::types::*;

/// Error types for history operations
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Failed to write history file: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize history: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("Failed to read history file: {0}")]
    ReadError(String),

    #[error("History file version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },

    #[error("Nothing to record: {0}")]
    NothingToRecord(String),
}

/// Persist the rollback log of a live session into its target directory
pub fn write_history(result: &SessionResult) -> Result<PathBuf, HistoryError> {
    if result.dry_run {
        return Err(HistoryError::NothingToRecord(
            "dry runs do not change the filesystem".to_string(),
        ));
    }

    let history = HistoryFile::new(
        OperationType::Rename,
        result.target_dir.clone(),
        result.rollback_log.clone(),
    );
    write_history_file(&history, &result.target_dir)
}

pub fn write_history_file(
    history: &HistoryFile,
    target_dir: &Path,
) -> Result<PathBuf, HistoryError> {
    let filename = history.generate_filename();
    let file_path = target_dir.join(&filename);

    if file_path.exists() {
        warn!("History file already exists: {:?}", file_path);
        let unique_filename = format!(
            "{}-{:03}.json",
            filename.trim_end_matches(".json"),
            history.executed_at.timestamp_subsec_millis()
        );
        let unique_path = target_dir.join(unique_filename);
        return write_to_path(history, &unique_path);
    }

    write_to_path(history, &file_path)
}

fn write_to_path(history: &HistoryFile, path: &Path) -> Result<PathBuf, HistoryError> {
    let temp_path = path.with_extension("json.tmp");

    {
        let file = File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, history)?;
    }

    fs::rename(&temp_path, path)?;

    info!("History written to: {:?}", path);

    Ok(path.to_path_buf())
}
