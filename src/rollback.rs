use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::history::{
    read_history, validate_for_revert, write_history_file, HistoryError, HistoryFile,
    OperationType,
};
use crate::rename::{OperationStatus, ProgressUpdate, RollbackEntry};
use crate::session::SessionResult;

#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

#[derive(Debug, Clone, Default)]
pub struct RollbackOptions {
    pub dry_run: bool,
}

/// A rename that was undone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredItem {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// A log entry that could not be undone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecoverableItem {
    pub path: PathBuf,
    pub original_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RollbackResult {
    /// In replay order
    pub restored: Vec<RestoredItem>,
    pub unrecoverable: Vec<UnrecoverableItem>,
    pub dry_run: bool,
    pub revert_history_path: Option<PathBuf>,
}

impl RollbackResult {
    pub fn is_clean(&self) -> bool {
        self.unrecoverable.is_empty()
    }
}

/// Undo a finished session's completed renames
pub fn rollback(result: &SessionResult) -> RollbackResult {
    if result.dry_run {
        debug!("Dry-run session changed nothing; nothing to roll back");
        return RollbackResult {
            dry_run: true,
            ..RollbackResult::default()
        };
    }

    rollback_entries(&result.rollback_log, &RollbackOptions::default(), &mut |_| {})
}

/// Replay a rollback log in reverse completion order.
///
/// Each entry is independent: a missing renamed path or an occupied original
/// name is reported and the replay continues.
pub fn rollback_entries(
    log: &[RollbackEntry],
    options: &RollbackOptions,
    on_progress: &mut dyn FnMut(&ProgressUpdate),
) -> RollbackResult {
    let total = log.len();
    let mut result = RollbackResult {
        dry_run: options.dry_run,
        ..RollbackResult::default()
    };
    // Dry runs record (restored, renamed) pairs to translate later paths
    let mut simulated: Vec<(PathBuf, PathBuf)> = Vec::new();

    for (i, entry) in log.iter().rev().enumerate() {
        let restore_path = entry.restore_path();
        let current = on_disk(&entry.renamed_path, &simulated);
        let occupied = on_disk(&restore_path, &simulated);

        debug!("Checking rollback: {:?} -> {}", entry.renamed_path, entry.original_name);

        let outcome = if fs::symlink_metadata(&current).is_err() {
            Err(format!(
                "'{}' no longer exists",
                entry.renamed_path.display()
            ))
        } else if fs::symlink_metadata(&occupied).is_ok() {
            Err(format!("'{}' already exists", restore_path.display()))
        } else if options.dry_run {
            simulated.push((restore_path.clone(), entry.renamed_path.clone()));
            Ok(())
        } else {
            fs::rename(&entry.renamed_path, &restore_path)
                .map_err(|e| format!("rename failed: {}", e))
        };

        let (status, detail) = match outcome {
            Ok(()) => {
                info!("Restored: {:?} -> {}", entry.renamed_path, entry.original_name);
                result.restored.push(RestoredItem {
                    from: entry.renamed_path.clone(),
                    to: restore_path,
                });
                (OperationStatus::Completed, None)
            }
            Err(reason) => {
                warn!(path = ?entry.renamed_path, reason = %reason, "Cannot roll back entry");
                result.unrecoverable.push(UnrecoverableItem {
                    path: entry.renamed_path.clone(),
                    original_name: entry.original_name.clone(),
                    reason: reason.clone(),
                });
                (OperationStatus::Failed, Some(reason))
            }
        };

        on_progress(&ProgressUpdate {
            completed: i + 1,
            total,
            current: entry.renamed_path.clone(),
            status,
            target_name: Some(entry.original_name.clone()),
            detail,
        });
    }

    result
}

/// Where `path` lives on disk given the renames a dry run pretended to do
fn on_disk(path: &Path, simulated: &[(PathBuf, PathBuf)]) -> PathBuf {
    let mut resolved = path.to_path_buf();
    for (restored, renamed) in simulated.iter().rev() {
        if let Ok(rest) = resolved.strip_prefix(restored) {
            resolved = if rest.as_os_str().is_empty() {
                renamed.clone()
            } else {
                renamed.join(rest)
            };
        }
    }
    resolved
}

/// Roll back a persisted session and record the revert itself
pub fn rollback_from_history(
    history_path: &Path,
    options: &RollbackOptions,
    on_progress: &mut dyn FnMut(&ProgressUpdate),
) -> Result<RollbackResult, RollbackError> {
    info!("Loading history from: {:?}", history_path);

    let history = read_history(history_path)?;
    validate_for_revert(&history)?;

    info!(
        "History contains {} changes from {}",
        history.changes.len(),
        history.executed_at
    );

    let mut result = rollback_entries(&history.changes, options, on_progress);

    if !options.dry_run && !result.restored.is_empty() {
        let revert = create_revert_history(&history, &result.restored);
        let path = write_history_file(&revert, &history.target_directory)?;
        info!("Revert history saved to: {:?}", path);
        result.revert_history_path = Some(path);
    }

    Ok(result)
}

fn create_revert_history(original: &HistoryFile, restored: &[RestoredItem]) -> HistoryFile {
    let changes = restored
        .iter()
        .map(|item| RollbackEntry {
            renamed_path: item.to.clone(),
            original_name: item
                .from
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        })
        .collect();

    HistoryFile::new(
        OperationType::Revert,
        original.target_directory.clone(),
        changes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::read_history;
    use tempfile::tempdir;

    /// Tree as it looks after a completed run, plus its rollback log
    fn renamed_tree() -> (tempfile::TempDir, Vec<RollbackEntry>) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("2024-01-05_sub/2023-12-25_nested")).unwrap();
        fs::write(dir.path().join("2024-03-01_a.txt"), "a").unwrap();

        let log = vec![
            RollbackEntry {
                renamed_path: dir.path().join("sub/2023-12-25_nested"),
                original_name: "nested".to_string(),
            },
            RollbackEntry {
                renamed_path: dir.path().join("2024-03-01_a.txt"),
                original_name: "a.txt".to_string(),
            },
            RollbackEntry {
                renamed_path: dir.path().join("2024-01-05_sub"),
                original_name: "sub".to_string(),
            },
        ];
        (dir, log)
    }

    #[test]
    fn test_rollback_restores_in_reverse_order() {
        let (dir, log) = renamed_tree();

        let result = rollback_entries(&log, &RollbackOptions::default(), &mut |_| {});

        assert!(result.is_clean());
        assert_eq!(result.restored.len(), 3);
        assert_eq!(result.restored[0].to, dir.path().join("sub"));
        assert!(dir.path().join("sub/nested").is_dir());
        assert!(dir.path().join("a.txt").is_file());
        assert!(!dir.path().join("2024-01-05_sub").exists());
    }

    #[test]
    fn test_rollback_dry_run_follows_simulated_paths() {
        let (dir, log) = renamed_tree();

        let options = RollbackOptions { dry_run: true };
        let result = rollback_entries(&log, &options, &mut |_| {});

        assert!(result.is_clean(), "{:?}", result.unrecoverable);
        assert_eq!(result.restored.len(), 3);
        assert!(dir.path().join("2024-01-05_sub/2023-12-25_nested").is_dir());
        assert!(!dir.path().join("sub").exists());
    }

    #[test]
    fn test_missing_path_is_unrecoverable_but_not_fatal() {
        let (dir, log) = renamed_tree();
        fs::remove_file(dir.path().join("2024-03-01_a.txt")).unwrap();

        let mut updates = Vec::new();
        let result = rollback_entries(&log, &RollbackOptions::default(), &mut |u| {
            updates.push(u.clone())
        });

        assert_eq!(result.restored.len(), 2);
        assert_eq!(result.unrecoverable.len(), 1);
        assert_eq!(result.unrecoverable[0].original_name, "a.txt");
        assert!(dir.path().join("sub/nested").is_dir());
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[1].status, OperationStatus::Failed);
    }

    #[test]
    fn test_collision_with_original_name_is_unrecoverable() {
        let (dir, log) = renamed_tree();
        fs::write(dir.path().join("a.txt"), "newcomer").unwrap();

        let result = rollback_entries(&log, &RollbackOptions::default(), &mut |_| {});

        assert_eq!(result.unrecoverable.len(), 1);
        assert!(result.unrecoverable[0].reason.contains("already exists"));
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "newcomer");
        assert!(dir.path().join("2024-03-01_a.txt").exists());
    }

    #[test]
    fn test_rollback_from_history_writes_revert_record() {
        let (dir, log) = renamed_tree();
        let history = HistoryFile::new(OperationType::Rename, dir.path().to_path_buf(), log);
        let history_path = write_history_file(&history, dir.path()).unwrap();

        let result =
            rollback_from_history(&history_path, &RollbackOptions::default(), &mut |_| {}).unwrap();

        assert!(result.is_clean());
        let revert_path = result.revert_history_path.unwrap();
        let revert = read_history(&revert_path).unwrap();
        assert_eq!(revert.operation, OperationType::Revert);
        assert_eq!(revert.changes.len(), 3);
        assert_eq!(revert.changes[0].original_name, "2024-01-05_sub");
    }

    #[test]
    fn test_revert_of_revert_reapplies_renames() {
        let (dir, log) = renamed_tree();
        let history = HistoryFile::new(OperationType::Rename, dir.path().to_path_buf(), log);
        let history_path = write_history_file(&history, dir.path()).unwrap();

        let first =
            rollback_from_history(&history_path, &RollbackOptions::default(), &mut |_| {}).unwrap();
        let revert_path = first.revert_history_path.unwrap();
        let second =
            rollback_from_history(&revert_path, &RollbackOptions::default(), &mut |_| {}).unwrap();

        assert!(second.is_clean());
        assert!(dir.path().join("2024-01-05_sub/2023-12-25_nested").is_dir());
        assert!(dir.path().join("2024-03-01_a.txt").is_file());
    }

    #[test]
    fn test_rollback_from_missing_history() {
        let result = rollback_from_history(
            Path::new("/nonexistent/history.json"),
            &RollbackOptions::default(),
            &mut |_| {},
        );
        assert!(matches!(result, Err(RollbackError::History(_))));
    }
}
