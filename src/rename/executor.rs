use chrono::Local;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{OperationKind, OperationStatus, ProgressUpdate, RenameOperation, RollbackEntry};

/// Cooperative cancellation flag, polled between operations
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the executor hands back besides the mutated operations
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub cancelled: bool,
    /// Completed renames in completion order
    pub rollback_log: Vec<RollbackEntry>,
}

/// Execute operations in planned order.
///
/// A failure only marks its own operation. In dry-run mode every check runs
/// but the filesystem is left untouched.
pub fn execute_operations(
    operations: &mut [RenameOperation],
    dry_run: bool,
    on_progress: &mut dyn FnMut(&ProgressUpdate),
    cancel: &CancelToken,
) -> ExecutionOutcome {
    let total = operations.len();
    let mut outcome = ExecutionOutcome::default();

    for (i, op) in operations.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            info!(done = i, total, "Cancellation requested, stopping");
            outcome.cancelled = true;
            break;
        }

        execute_one(op, dry_run, &mut outcome.rollback_log);

        on_progress(&ProgressUpdate {
            completed: i + 1,
            total,
            current: op.source_path().to_path_buf(),
            status: op.status,
            target_name: op.target_name.clone(),
            detail: op.reason(),
        });
    }

    outcome
}

fn execute_one(op: &mut RenameOperation, dry_run: bool, log: &mut Vec<RollbackEntry>) {
    if op.kind == OperationKind::Skipped {
        op.status = OperationStatus::Skipped;
        return;
    }

    if let Some(message) = op.blocked.take() {
        fail(op, message);
        return;
    }

    let Some(target_path) = op.target_path() else {
        fail(op, "no target name planned".to_string());
        return;
    };

    op.status = OperationStatus::InProgress;
    let source_path = op.source_path().to_path_buf();

    if let Err(e) = revalidate(&source_path, &target_path) {
        fail(op, e.to_string());
        return;
    }

    if dry_run {
        debug!("Would rename: {:?} -> {:?}", source_path, target_path);
    } else {
        if let Err(e) = fs::rename(&source_path, &target_path) {
            fail(op, format!("rename failed: {}", e));
            return;
        }
        info!("Renamed: {} -> {:?}", op.original_name, target_path);
    }

    op.status = OperationStatus::Completed;
    op.completed_at = Some(Local::now());
    log.push(RollbackEntry {
        renamed_path: target_path,
        original_name: op.original_name.clone(),
    });
}

/// Paths may have changed since planning; check again right before renaming
fn revalidate(source: &Path, target: &Path) -> io::Result<()> {
    fs::symlink_metadata(source).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("source no longer accessible: {} ({})", source.display(), e),
        )
    })?;

    if fs::symlink_metadata(target).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("target already exists: {}", target.display()),
        ));
    }

    Ok(())
}

fn fail(op: &mut RenameOperation, message: String) {
    warn!(path = ?op.source_path(), error = %message, "Operation failed");
    op.status = OperationStatus::Failed;
    op.error = Some(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::types::SkipReason;
    use crate::scanner::{Entry, EntryKind};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn op_for(
        path: PathBuf,
        kind: EntryKind,
        depth: usize,
        target: Option<&str>,
    ) -> RenameOperation {
        let entry = Arc::new(Entry {
            name: path.file_name().unwrap().to_string_lossy().to_string(),
            path,
            kind,
            created: None,
            has_prefix: false,
            depth,
            error: None,
        });
        match target {
            Some(t) => RenameOperation::rename(entry, t.to_string()),
            None => RenameOperation::skipped(entry, SkipReason::AlreadyPrefixed),
        }
    }

    fn run(ops: &mut [RenameOperation], dry_run: bool) -> (ExecutionOutcome, Vec<ProgressUpdate>) {
        let mut updates = Vec::new();
        let outcome = execute_operations(
            ops,
            dry_run,
            &mut |u: &ProgressUpdate| updates.push(u.clone()),
            &CancelToken::new(),
        );
        (outcome, updates)
    }

    #[test]
    fn test_executes_renames_and_records_rollback() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub/nested")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let mut ops = vec![
            op_for(
                dir.path().join("sub/nested"),
                EntryKind::Directory,
                1,
                Some("2023-12-25_nested"),
            ),
            op_for(dir.path().join("a.txt"), EntryKind::File, 0, Some("2024-03-01_a.txt")),
            op_for(dir.path().join("sub"), EntryKind::Directory, 0, Some("2024-01-05_sub")),
        ];

        let (outcome, updates) = run(&mut ops, false);

        assert!(!outcome.cancelled);
        assert!(ops.iter().all(|op| op.status == OperationStatus::Completed));
        assert!(ops.iter().all(|op| op.completed_at.is_some()));
        assert!(dir.path().join("2024-01-05_sub/2023-12-25_nested").is_dir());
        assert!(dir.path().join("2024-03-01_a.txt").is_file());

        assert_eq!(outcome.rollback_log.len(), 3);
        assert_eq!(outcome.rollback_log[0].original_name, "nested");
        assert_eq!(outcome.rollback_log[2].original_name, "sub");

        let counts: Vec<usize> = updates.iter().map(|u| u.completed).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert!(updates.iter().all(|u| u.total == 3));
    }

    #[test]
    fn test_dry_run_leaves_filesystem_untouched() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let mut ops = vec![op_for(
            dir.path().join("a.txt"),
            EntryKind::File,
            0,
            Some("2024-03-01_a.txt"),
        )];
        let (outcome, _) = run(&mut ops, true);

        assert_eq!(ops[0].status, OperationStatus::Completed);
        assert_eq!(outcome.rollback_log.len(), 1);
        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("2024-03-01_a.txt").exists());
    }

    #[test]
    fn test_target_appearing_after_planning_fails_operation() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let mut ops = vec![
            op_for(dir.path().join("a.txt"), EntryKind::File, 0, Some("2024-03-01_a.txt")),
            op_for(dir.path().join("b.txt"), EntryKind::File, 0, Some("2024-03-01_b.txt")),
        ];
        // Someone else creates the target between planning and execution
        fs::write(dir.path().join("2024-03-01_a.txt"), "intruder").unwrap();

        let (outcome, updates) = run(&mut ops, false);

        assert_eq!(ops[0].status, OperationStatus::Failed);
        assert!(ops[0].error.as_ref().unwrap().contains("already exists"));
        assert_eq!(ops[1].status, OperationStatus::Completed);
        assert_eq!(outcome.rollback_log.len(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("2024-03-01_a.txt")).unwrap(),
            "intruder"
        );
        assert!(updates[0].detail.is_some());
    }

    #[test]
    fn test_vanished_source_fails_operation() {
        let dir = tempdir().unwrap();
        let mut ops = vec![op_for(
            dir.path().join("gone"),
            EntryKind::File,
            0,
            Some("2024-03-01_gone"),
        )];

        let (outcome, _) = run(&mut ops, false);

        assert_eq!(ops[0].status, OperationStatus::Failed);
        assert!(outcome.rollback_log.is_empty());
    }

    #[test]
    fn test_skipped_and_blocked_operations() {
        let dir = tempdir().unwrap();
        let mut blocked = op_for(dir.path().join("x"), EntryKind::Directory, 0, Some("unused"));
        blocked.target_name = None;
        blocked.blocked = Some("Permission denied".to_string());

        let mut ops = vec![
            op_for(dir.path().join("2024-01-01_y"), EntryKind::File, 0, None),
            blocked,
        ];
        let (_, updates) = run(&mut ops, false);

        assert_eq!(ops[0].status, OperationStatus::Skipped);
        assert_eq!(ops[1].status, OperationStatus::Failed);
        assert_eq!(ops[1].error.as_deref(), Some("Permission denied"));
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn test_cancellation_between_operations() {
        let dir = tempdir().unwrap();
        for name in ["a", "b", "c"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        let mut ops: Vec<RenameOperation> = ["a", "b", "c"]
            .iter()
            .map(|n| {
                op_for(
                    dir.path().join(n),
                    EntryKind::File,
                    0,
                    Some(format!("2024-03-01_{}", n).as_str()),
                )
            })
            .collect();

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let outcome = execute_operations(
            &mut ops,
            false,
            &mut |u: &ProgressUpdate| {
                if u.completed == 1 {
                    trigger.cancel();
                }
            },
            &cancel,
        );

        assert!(outcome.cancelled);
        assert_eq!(ops[0].status, OperationStatus::Completed);
        assert_eq!(ops[1].status, OperationStatus::Pending);
        assert_eq!(ops[2].status, OperationStatus::Pending);
        assert_eq!(outcome.rollback_log.len(), 1);
        assert!(dir.path().join("b").exists());
    }
}
