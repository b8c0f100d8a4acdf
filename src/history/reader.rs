use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::types::*;
use super::writer::HistoryError;

/// Read and parse a history file
pub fn read_history(path: &Path) -> Result<HistoryFile, HistoryError> {
    let file = File::open(path)
        .map_err(|e| HistoryError::ReadError(format!("Cannot open file: {}", e)))?;

    let reader = BufReader::new(file);
    let history: HistoryFile = serde_json::from_reader(reader)
        .map_err(|e| HistoryError::ReadError(format!("Invalid JSON: {}", e)))?;

    if history.version != HISTORY_VERSION {
        return Err(HistoryError::VersionMismatch {
            expected: HISTORY_VERSION.to_string(),
            found: history.version,
        });
    }

    Ok(history)
}

/// Validate that a history file can be used for revert
pub fn validate_for_revert(history: &HistoryFile) -> Result<(), HistoryError> {
    if !history.target_directory.is_dir() {
        return Err(HistoryError::ReadError(format!(
            "Target directory no longer exists: {:?}",
            history.target_directory
        )));
    }

    if let Some(stray) = history
        .changes
        .iter()
        .find(|c| !c.renamed_path.starts_with(&history.target_directory))
    {
        return Err(HistoryError::ReadError(format!(
            "Change outside target directory: {:?}",
            stray.renamed_path
        )));
    }

    Ok(())
}
