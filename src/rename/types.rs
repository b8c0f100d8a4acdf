use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::scanner::{Entry, EntryKind};

/// What a planned operation will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    FileRename,
    DirectoryRename,
    Skipped,
}

impl OperationKind {
    pub fn for_entry(entry: &Entry) -> Self {
        match entry.kind {
            EntryKind::Directory => OperationKind::DirectoryRename,
            EntryKind::File | EntryKind::Symlink => OperationKind::FileRename,
        }
    }
}

/// Lifecycle of an operation; transitions are owned by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Skipped
        )
    }
}

/// Why a planned operation will not be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyPrefixed,
    NameCollision(String),
    InvalidTargetName { target: String, reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyPrefixed => write!(f, "already has a date prefix"),
            SkipReason::NameCollision(target) => {
                write!(f, "name collision: '{}' already exists", target)
            }
            SkipReason::InvalidTargetName { target, reason } => {
                write!(f, "invalid target name '{}': {}", target, reason)
            }
        }
    }
}

/// A planned or executed rename of one scanned entry
#[derive(Debug, Clone)]
pub struct RenameOperation {
    pub entry: Arc<Entry>,
    pub original_name: String,
    /// Absent for skipped operations
    pub target_name: Option<String>,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub skip_reason: Option<SkipReason>,
    /// Present only when the operation failed
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Local>>,
    /// Failure known at plan time, applied by the executor
    pub(crate) blocked: Option<String>,
}

impl RenameOperation {
    pub fn rename(entry: Arc<Entry>, target_name: String) -> Self {
        let kind = OperationKind::for_entry(&entry);
        Self {
            original_name: entry.name.clone(),
            target_name: Some(target_name),
            kind,
            status: OperationStatus::Pending,
            skip_reason: None,
            error: None,
            completed_at: None,
            blocked: None,
            entry,
        }
    }

    pub fn skipped(entry: Arc<Entry>, reason: SkipReason) -> Self {
        Self {
            original_name: entry.name.clone(),
            target_name: None,
            kind: OperationKind::Skipped,
            status: OperationStatus::Pending,
            skip_reason: Some(reason),
            error: None,
            completed_at: None,
            blocked: None,
            entry,
        }
    }

    pub(crate) fn blocked(entry: Arc<Entry>, message: String) -> Self {
        let kind = OperationKind::for_entry(&entry);
        Self {
            original_name: entry.name.clone(),
            target_name: None,
            kind,
            status: OperationStatus::Pending,
            skip_reason: None,
            error: None,
            completed_at: None,
            blocked: Some(message),
            entry,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.entry.path
    }

    pub fn target_path(&self) -> Option<PathBuf> {
        let target = self.target_name.as_ref()?;
        self.entry.path.parent().map(|parent| parent.join(target))
    }

    pub fn depth(&self) -> usize {
        self.entry.depth
    }

    /// Human-readable reason for a skipped or failed operation
    pub fn reason(&self) -> Option<String> {
        match self.status {
            OperationStatus::Failed => self.error.clone(),
            OperationStatus::Skipped => self.skip_reason.as_ref().map(|r| r.to_string()),
            _ => None,
        }
    }
}

/// One completed rename, sufficient to undo it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackEntry {
    /// Path of the item right after it was renamed
    pub renamed_path: PathBuf,
    /// Name to restore
    pub original_name: String,
}

impl RollbackEntry {
    pub fn restore_path(&self) -> PathBuf {
        self.renamed_path
            .parent()
            .map(|parent| parent.join(&self.original_name))
            .unwrap_or_else(|| PathBuf::from(&self.original_name))
    }

    pub fn renamed_name(&self) -> String {
        self.renamed_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Snapshot delivered after every processed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub completed: usize,
    pub total: usize,
    pub current: PathBuf,
    pub status: OperationStatus,
    pub target_name: Option<String>,
    pub detail: Option<String>,
}
