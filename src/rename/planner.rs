use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::prefix::{format_prefix, target_name, validate_name, NamePlatform, NameRules};
use crate::scanner::Entry;

use super::types::{RenameOperation, SkipReason};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Entry is outside the target directory: {0}")]
    OutsideRoot(PathBuf),

    #[error("Entry discovered twice: {0}")]
    DuplicateEntry(PathBuf),
}

/// Turn scanned entries into an ordered, conflict-checked operation list.
///
/// Only eligible entries produce operations. Directories come deepest-first
/// so that a descendant is always renamed before any of its ancestors.
pub fn plan_operations(
    root: &Path,
    entries: &[Arc<Entry>],
    rules: &NameRules,
) -> Result<Vec<RenameOperation>, PlanError> {
    let mut seen: HashSet<&Path> = HashSet::with_capacity(entries.len());
    let mut claimed: HashSet<(PathBuf, String)> = HashSet::new();
    let mut operations = Vec::new();

    for entry in entries {
        if !entry.path.starts_with(root) || entry.path == root {
            return Err(PlanError::OutsideRoot(entry.path.clone()));
        }
        if !seen.insert(entry.path.as_path()) {
            return Err(PlanError::DuplicateEntry(entry.path.clone()));
        }

        if !entry.is_eligible() {
            continue;
        }

        operations.push(plan_entry(entry, rules, &mut claimed));
    }

    // Stable sort keeps path order within a depth
    operations.sort_by(|a, b| {
        b.depth()
            .cmp(&a.depth())
            .then_with(|| a.source_path().cmp(b.source_path()))
    });

    info!(
        count = operations.len(),
        renames = operations.iter().filter(|op| op.target_name.is_some()).count(),
        "Planned operations"
    );

    Ok(operations)
}

fn plan_entry(
    entry: &Arc<Entry>,
    rules: &NameRules,
    claimed: &mut HashSet<(PathBuf, String)>,
) -> RenameOperation {
    if entry.has_prefix {
        debug!(name = %entry.name, "Already prefixed");
        return RenameOperation::skipped(Arc::clone(entry), SkipReason::AlreadyPrefixed);
    }

    if let Some(error) = &entry.error {
        debug!(path = ?entry.path, error = %error, "Entry cannot be renamed");
        return RenameOperation::blocked(Arc::clone(entry), error.clone());
    }

    let Some(created) = entry.created else {
        return RenameOperation::blocked(
            Arc::clone(entry),
            "creation date unavailable".to_string(),
        );
    };

    let target = target_name(&entry.name, &format_prefix(created.day()));

    if let Err(invalid) = validate_name(&target, rules) {
        debug!(target = %target, reason = %invalid, "Invalid target name");
        return RenameOperation::skipped(
            Arc::clone(entry),
            SkipReason::InvalidTargetName {
                target,
                reason: invalid.to_string(),
            },
        );
    }

    let parent = entry
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let key = (parent.clone(), claim_key(&target, rules));
    if claimed.contains(&key) || fs::symlink_metadata(parent.join(&target)).is_ok() {
        debug!(name = %entry.name, target = %target, "Name collision");
        return RenameOperation::skipped(Arc::clone(entry), SkipReason::NameCollision(target));
    }

    claimed.insert(key);
    debug!(name = %entry.name, target = %target, "Planned rename");
    RenameOperation::rename(Arc::clone(entry), target)
}

/// Windows and macOS filesystems compare names case-insensitively
fn claim_key(target: &str, rules: &NameRules) -> String {
    match rules.platform {
        NamePlatform::Windows | NamePlatform::MacOs => target.to_lowercase(),
        NamePlatform::Unix => target.to_string(),
    }
}
