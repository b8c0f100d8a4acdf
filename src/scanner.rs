use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::history::HISTORY_FILE_PREFIX;
use crate::prefix::has_prefix;
use crate::resolver::{CreationDate, DateResolver};

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to read directory: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScannerError {
    fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ScannerError::PathNotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                ScannerError::PermissionDenied(path.to_path_buf())
            }
            _ => ScannerError::IoError(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// One filesystem object discovered during a scan
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
    /// Resolved creation date; `None` when attributes could not be read
    pub created: Option<CreationDate>,
    pub has_prefix: bool,
    /// 0 for items directly inside the scanned root
    pub depth: usize,
    /// Per-entry failure recorded during the walk
    pub error: Option<String>,
}

impl Entry {
    /// Symlinks never qualify; below the root only directories do
    pub fn is_eligible(&self) -> bool {
        match self.kind {
            EntryKind::Symlink => false,
            EntryKind::Directory => true,
            EntryKind::File => self.depth == 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Include names starting with '.'
    pub include_hidden: bool,
    /// Globs matched against the entry name and its root-relative path.
    /// A matching directory is not descended into.
    pub exclude_patterns: Vec<String>,
    /// When non-empty, root-level files must carry one of these extensions
    /// (case-insensitive, leading dot optional)
    pub extensions: Vec<String>,
    /// Deepest depth to record; 0 scans only the root's direct children
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    pub hidden_skipped: usize,
    /// Dropped by exclude patterns, the extension filter, or as history files
    pub excluded: usize,
    pub errors: usize,
}

/// Ordered scan output, sorted by (depth, path)
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub root: PathBuf,
    pub entries: Vec<Arc<Entry>>,
    pub stats: ScanStats,
}

impl ScanReport {
    pub fn eligible(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.entries.iter().filter(|e| e.is_eligible())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn name_starts_with(entry: &walkdir::DirEntry, prefix: &str) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with(prefix))
        .unwrap_or(false)
}

fn has_wanted_extension(entry: &walkdir::DirEntry, extensions: &[String]) -> bool {
    Path::new(entry.file_name())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn build_exclude_set(patterns: &[String]) -> Result<Option<GlobSet>, ScannerError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScannerError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|source| ScannerError::InvalidPattern {
            pattern: patterns.join(", "),
            source,
        })
}

/// Why the walk drops an entry, if it does
fn filter_reason(
    entry: &walkdir::DirEntry,
    root: &Path,
    options: &ScanOptions,
    excludes: Option<&GlobSet>,
) -> Option<Filtered> {
    // History files are skipped at any depth, hidden or not
    if name_starts_with(entry, HISTORY_FILE_PREFIX) {
        return Some(Filtered::Excluded);
    }

    if !options.include_hidden && name_starts_with(entry, ".") {
        return Some(Filtered::Hidden);
    }

    if !options.extensions.is_empty()
        && entry.depth() == 1
        && !entry.file_type().is_dir()
        && !has_wanted_extension(entry, &options.extensions)
    {
        return Some(Filtered::Excluded);
    }

    if let Some(globs) = excludes {
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if globs.is_match(entry.file_name()) || globs.is_match(relative) {
            return Some(Filtered::Excluded);
        }
    }

    None
}

enum Filtered {
    Hidden,
    Excluded,
}

/// Walk `root` and classify every entry below it.
///
/// Symlinks are recorded but never followed. Failing to open the root is
/// fatal; any other failure is recorded on the affected entry.
pub fn scan_tree(
    root: &Path,
    resolver: &dyn DateResolver,
    options: &ScanOptions,
) -> Result<ScanReport, ScannerError> {
    debug!(path = ?root, "Scanning directory tree");

    let metadata = fs::metadata(root).map_err(|e| ScannerError::from_io(root, e))?;
    if !metadata.is_dir() {
        return Err(ScannerError::NotADirectory(root.to_path_buf()));
    }

    // Surface an unreadable root before walking
    fs::read_dir(root).map_err(|e| ScannerError::from_io(root, e))?;

    let excludes = build_exclude_set(&options.exclude_patterns)?;

    let mut stats = ScanStats::default();
    let mut hidden_skipped = 0;
    let mut excluded = 0;
    let mut entries: Vec<Entry> = Vec::new();
    let mut failures: HashMap<PathBuf, String> = HashMap::new();

    let mut walk = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    if let Some(depth) = options.max_depth {
        walk = walk.max_depth(depth + 1);
    }

    let walker = walk.into_iter().filter_entry(|e| {
        match filter_reason(e, root, options, excludes.as_ref()) {
            Some(Filtered::Hidden) => {
                trace!(path = ?e.path(), "Skipping hidden entry");
                hidden_skipped += 1;
                false
            }
            Some(Filtered::Excluded) => {
                trace!(path = ?e.path(), "Skipping excluded entry");
                excluded += 1;
                false
            }
            None => true,
        }
    });

    for item in walker {
        match item {
            Ok(dir_entry) => {
                let entry = build_entry(&dir_entry, resolver);
                match entry.kind {
                    EntryKind::File => stats.files += 1,
                    EntryKind::Directory => stats.directories += 1,
                    EntryKind::Symlink => stats.symlinks += 1,
                }
                if entry.error.is_some() {
                    stats.errors += 1;
                }
                entries.push(entry);
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());

                if path == root {
                    let io_err = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk error at root"));
                    return Err(ScannerError::from_io(root, io_err));
                }

                warn!(path = ?path, error = %err, "Failed to read entry");
                stats.errors += 1;
                failures.insert(path, err.to_string());
            }
        }
    }

    stats.hidden_skipped = hidden_skipped;
    stats.excluded = excluded;

    // Directory read failures arrive after the directory itself was yielded
    for entry in &mut entries {
        if let Some(message) = failures.remove(&entry.path) {
            if entry.error.is_none() {
                entry.error = Some(message);
            }
        }
    }
    for (path, message) in failures {
        warn!(path = ?path, error = %message, "Unattributed scan failure");
    }

    entries.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.path.cmp(&b.path)));

    debug!(
        count = entries.len(),
        files = stats.files,
        directories = stats.directories,
        symlinks = stats.symlinks,
        "Scan complete"
    );

    Ok(ScanReport {
        root: root.to_path_buf(),
        entries: entries.into_iter().map(Arc::new).collect(),
        stats,
    })
}

fn build_entry(dir_entry: &walkdir::DirEntry, resolver: &dyn DateResolver) -> Entry {
    let path = dir_entry.path().to_path_buf();
    let file_type = dir_entry.file_type();

    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    let depth = dir_entry.depth().saturating_sub(1);

    trace!(path = ?path, kind = ?kind, depth, "Examining entry");

    let (name, mut error) = match dir_entry.file_name().to_str() {
        Some(n) => (n.to_string(), None),
        None => (
            dir_entry.file_name().to_string_lossy().to_string(),
            Some("name is not valid UTF-8".to_string()),
        ),
    };

    let created = match resolver.resolve(&path) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(path = ?path, error = %e, "Could not resolve creation date");
            error.get_or_insert_with(|| e.to_string());
            None
        }
    };

    Entry {
        has_prefix: has_prefix(&name),
        path,
        name,
        kind,
        created,
        depth,
        error,
    }
}
