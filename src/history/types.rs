use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rename::RollbackEntry;

pub const HISTORY_VERSION: &str = "1.0";

/// Hidden so that a later scan of the target directory never renames it
pub const HISTORY_FILE_PREFIX: &str = ".dateprefix-history-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFile {
    /// Schema version for compatibility
    pub version: String,

    /// When the operation was executed
    pub executed_at: DateTime<Utc>,

    /// Type of operation performed
    pub operation: OperationType,

    /// Target directory path
    pub target_directory: PathBuf,

    /// Tool version that created this history
    pub tool_version: String,

    /// Completed renames in completion order
    pub changes: Vec<RollbackEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Rename,
    Revert,
}

impl HistoryFile {
    pub fn new(
        operation: OperationType,
        target_directory: PathBuf,
        changes: Vec<RollbackEntry>,
    ) -> Self {
        Self {
            version: HISTORY_VERSION.to_string(),
            executed_at: Utc::now(),
            operation,
            target_directory,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            changes,
        }
    }

    /// Generate the filename for this history file
    pub fn generate_filename(&self) -> String {
        let timestamp = self.executed_at.format("%Y%m%d-%H%M%S");
        let kind = match self.operation {
            OperationType::Rename => "",
            OperationType::Revert => "revert-",
        };
        format!("{}{}{}.json", HISTORY_FILE_PREFIX, kind, timestamp)
    }
}
