use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::rename::{OperationKind, OperationStatus, RenameOperation, SkipReason};
use crate::rollback::RollbackResult;
use crate::scanner::ScanStats;
use crate::session::{SessionResult, SessionState};

/// Display dry run results in a formatted output
pub fn display_dry_run(result: &SessionResult, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "========================================")?;
    writeln!(writer, "              DRY RUN")?;
    writeln!(writer, "========================================")?;
    writeln!(writer)?;
    writeln!(writer, "Target:     {}", result.target_dir.display())?;
    writeln!(writer, "Discovered: {}", result.discovered_count)?;
    writeln!(writer)?;

    let planned: Vec<&RenameOperation> = result.completed().collect();
    if planned.is_empty() {
        writeln!(writer, "Nothing to rename.")?;
    } else {
        writeln!(writer, "Planned changes:")?;
        writeln!(writer)?;
        for (i, op) in planned.iter().enumerate() {
            writeln!(writer, "  {}. {}", i + 1, relative(&result.target_dir, op.source_path()))?;
            writeln!(writer, "     To: {}", op.target_name.as_deref().unwrap_or("-"))?;
        }
        writeln!(writer)?;
    }

    write_problems(result, writer)?;

    writeln!(writer, "----------------------------------------")?;
    writeln!(writer, "Summary:")?;
    writeln!(writer, "  {} items would be renamed", result.renamed_count)?;
    writeln!(writer, "  {} items skipped", result.skipped_count)?;
    if result.failed_count > 0 {
        writeln!(writer, "  {} items failed", result.failed_count)?;
    }
    writeln!(writer)?;
    writeln!(writer, "Run without --dry to apply these changes.")?;

    Ok(())
}

/// Display execution results (non-dry-run)
pub fn display_execution_result(result: &SessionResult, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer)?;
    if result.is_cancelled() {
        writeln!(
            writer,
            "Cancelled: renamed {} of {} planned items.",
            result.renamed_count,
            result.operations.len()
        )?;
    } else {
        writeln!(writer, "Successfully renamed {} items.", result.renamed_count)?;
    }

    if result.skipped_count > 0 {
        writeln!(writer, "  {} items were skipped.", result.skipped_count)?;
    }
    if result.failed_count > 0 {
        writeln!(writer, "  {} items failed.", result.failed_count)?;
    }

    if has_problems(result) {
        writeln!(writer)?;
        write_problems(result, writer)?;
    }

    Ok(())
}

/// Skips that need attention; already-prefixed items are the expected case
fn noteworthy_skips(result: &SessionResult) -> impl Iterator<Item = &RenameOperation> {
    result
        .skipped()
        .filter(|op| op.skip_reason != Some(SkipReason::AlreadyPrefixed))
}

fn has_problems(result: &SessionResult) -> bool {
    result.failed_count > 0 || noteworthy_skips(result).next().is_some()
}

fn write_problems(result: &SessionResult, writer: &mut impl Write) -> io::Result<()> {
    let failed: Vec<&RenameOperation> = result.failed().collect();
    if !failed.is_empty() {
        writeln!(writer, "Failed:")?;
        for op in failed {
            writeln!(
                writer,
                "  - {}: {}",
                relative(&result.target_dir, op.source_path()),
                op.reason().unwrap_or_default()
            )?;
        }
        writeln!(writer)?;
    }

    let skipped: Vec<&RenameOperation> = noteworthy_skips(result).collect();
    if !skipped.is_empty() {
        writeln!(writer, "Skipped:")?;
        for op in skipped {
            writeln!(
                writer,
                "  - {}: {}",
                relative(&result.target_dir, op.source_path()),
                op.reason().unwrap_or_default()
            )?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Display the outcome of a rollback
pub fn display_rollback_result(result: &RollbackResult, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer)?;
    let verb = if result.dry_run {
        "would be restored"
    } else {
        "restored"
    };
    writeln!(writer, "{} items {}.", result.restored.len(), verb)?;

    if !result.unrecoverable.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Could not restore {} items:", result.unrecoverable.len())?;
        for item in &result.unrecoverable {
            writeln!(
                writer,
                "  - {} (was '{}'): {}",
                item.path.display(),
                item.original_name,
                item.reason
            )?;
        }
    }

    if let Some(path) = &result.revert_history_path {
        writeln!(writer)?;
        writeln!(writer, "Revert history: {}", path.display())?;
    }

    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Machine-readable session summary
#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    pub target_directory: &'a Path,
    pub status: SessionState,
    pub dry_run: bool,
    pub discovered: usize,
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub scan: ScanStats,
    pub history_file: Option<&'a Path>,
    pub operations: Vec<OperationReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct OperationReport<'a> {
    pub source: &'a Path,
    pub target: Option<&'a str>,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub reason: Option<String>,
}

impl<'a> SessionReport<'a> {
    pub fn new(result: &'a SessionResult, history_file: Option<&'a Path>) -> Self {
        Self {
            target_directory: &result.target_dir,
            status: result.status,
            dry_run: result.dry_run,
            discovered: result.discovered_count,
            renamed: result.renamed_count,
            skipped: result.skipped_count,
            failed: result.failed_count,
            scan: result.scan_stats,
            history_file,
            operations: result
                .operations
                .iter()
                .map(|op| OperationReport {
                    source: op.source_path(),
                    target: op.target_name.as_deref(),
                    kind: op.kind,
                    status: op.status,
                    reason: op.reason(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RollbackReport<'a> {
    pub dry_run: bool,
    pub restored: Vec<RestoredReport<'a>>,
    pub unrecoverable: Vec<UnrecoverableReport<'a>>,
    pub history_file: Option<&'a PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct RestoredReport<'a> {
    pub from: &'a Path,
    pub to: &'a Path,
}

#[derive(Debug, Serialize)]
pub struct UnrecoverableReport<'a> {
    pub path: &'a Path,
    pub original_name: &'a str,
    pub reason: &'a str,
}

impl<'a> RollbackReport<'a> {
    pub fn new(result: &'a RollbackResult) -> Self {
        Self {
            dry_run: result.dry_run,
            restored: result
                .restored
                .iter()
                .map(|r| RestoredReport {
                    from: &r.from,
                    to: &r.to,
                })
                .collect(),
            unrecoverable: result
                .unrecoverable
                .iter()
                .map(|u| UnrecoverableReport {
                    path: &u.path,
                    original_name: &u.original_name,
                    reason: &u.reason,
                })
                .collect(),
            history_file: result.revert_history_path.as_ref(),
        }
    }
}

/// Write any serializable report as pretty JSON
pub fn display_json<T: Serialize>(report: &T, writer: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::CancelToken;
    use crate::resolver::ModifiedTimeResolver;
    use crate::rollback::{RestoredItem, UnrecoverableItem};
    use crate::session::{Session, SessionOptions};
    use std::fs;
    use tempfile::tempdir;

    fn run_in(dir: &Path, dry_run: bool) -> SessionResult {
        fs::write(dir.join("notes.txt"), "n").unwrap();
        fs::write(dir.join("2020-01-01_old.txt"), "o").unwrap();
        let options = SessionOptions {
            dry_run,
            ..SessionOptions::default()
        };
        Session::new(dir, options)
            .with_resolver(Box::new(ModifiedTimeResolver))
            .run(&mut |_| {}, &CancelToken::new())
            .unwrap()
    }

    #[test]
    fn test_display_dry_run() {
        let dir = tempdir().unwrap();
        let result = run_in(dir.path(), true);
        let mut output = Vec::new();

        display_dry_run(&result, &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("DRY RUN"));
        assert!(output_str.contains("1. notes.txt"));
        assert!(output_str.contains("_notes.txt"));
        assert!(output_str.contains("1 items would be renamed"));
        assert!(output_str.contains("1 items skipped"));
    }

    #[test]
    fn test_display_execution_result() {
        let dir = tempdir().unwrap();
        let result = run_in(dir.path(), false);
        let mut output = Vec::new();

        display_execution_result(&result, &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("Successfully renamed 1 items"));
        assert!(output_str.contains("1 items were skipped"));
    }

    #[test]
    fn test_reports_list_skip_reasons() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(&"x".repeat(250)), "x").unwrap();

        for dry_run in [true, false] {
            let result = run_in(dir.path(), dry_run);
            let mut output = Vec::new();

            if dry_run {
                display_dry_run(&result, &mut output).unwrap();
            } else {
                display_execution_result(&result, &mut output).unwrap();
            }

            let output_str = String::from_utf8(output).unwrap();
            assert!(output_str.contains("Skipped:"));
            assert!(output_str.contains("invalid target name"));
            // Already-prefixed items are counted, not listed
            assert!(!output_str.contains("2020-01-01_old.txt: "));
        }
    }

    #[test]
    fn test_json_report() {
        let dir = tempdir().unwrap();
        let result = run_in(dir.path(), true);
        let mut output = Vec::new();

        display_json(&SessionReport::new(&result, None), &mut output).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["renamed"], 1);
        assert_eq!(value["skipped"], 1);
        assert_eq!(value["operations"].as_array().unwrap().len(), 2);
        assert_eq!(value["operations"][0]["status"], "skipped");
        assert_eq!(value["operations"][1]["kind"], "file_rename");
    }

    #[test]
    fn test_display_rollback_result() {
        let result = RollbackResult {
            restored: vec![RestoredItem {
                from: PathBuf::from("/d/2024-01-01_a"),
                to: PathBuf::from("/d/a"),
            }],
            unrecoverable: vec![UnrecoverableItem {
                path: PathBuf::from("/d/2024-01-01_b"),
                original_name: "b".to_string(),
                reason: "'/d/2024-01-01_b' no longer exists".to_string(),
            }],
            dry_run: false,
            revert_history_path: None,
        };
        let mut output = Vec::new();

        display_rollback_result(&result, &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("1 items restored"));
        assert!(output_str.contains("Could not restore 1 items"));
        assert!(output_str.contains("(was 'b')"));
    }
}
