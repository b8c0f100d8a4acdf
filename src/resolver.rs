//! Creation-date resolution for filesystem entries.
//!
//! Birth time is preferred wherever the platform and filesystem expose it.
//! Otherwise the last-modification time is used. Entry contents are never read.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug)]
pub enum DateError {
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied reading attributes: {0}")]
    PermissionDenied(PathBuf),

    #[error("Cannot read attributes of {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DateError {
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => DateError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => DateError::PermissionDenied(path.to_path_buf()),
            _ => DateError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Which timestamp a resolved date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Birth,
    Modified,
}

/// A resolved creation instant in the local timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationDate {
    pub instant: DateTime<Local>,
    pub source: DateSource,
}

impl CreationDate {
    pub fn new(time: SystemTime, source: DateSource) -> Self {
        Self {
            instant: DateTime::<Local>::from(time),
            source,
        }
    }

    /// Calendar date that drives the prefix; time-of-day is discarded
    pub fn day(&self) -> NaiveDate {
        self.instant.date_naive()
    }
}

/// Resolves the best-available creation instant of a filesystem entry.
///
/// Symbolic links are never followed: the link's own attributes are used.
pub trait DateResolver: Send + Sync {
    fn resolve_metadata(&self, metadata: &Metadata) -> io::Result<CreationDate>;

    fn resolve(&self, path: &Path) -> Result<CreationDate, DateError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| DateError::from_io(path, e))?;
        let date = self
            .resolve_metadata(&metadata)
            .map_err(|e| DateError::from_io(path, e))?;

        trace!(path = ?path, date = %date.day(), source = ?date.source, "Resolved date");
        Ok(date)
    }
}

/// Uses birth time when available, falling back to modification time
#[derive(Debug, Default, Clone, Copy)]
pub struct BirthTimeResolver;

impl DateResolver for BirthTimeResolver {
    fn resolve_metadata(&self, metadata: &Metadata) -> io::Result<CreationDate> {
        let modified = metadata.modified()?;
        Ok(pick_creation_time(
            metadata.created().ok(),
            modified,
            SystemTime::now(),
        ))
    }
}

/// Always uses modification time
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifiedTimeResolver;

impl DateResolver for ModifiedTimeResolver {
    fn resolve_metadata(&self, metadata: &Metadata) -> io::Result<CreationDate> {
        Ok(CreationDate::new(metadata.modified()?, DateSource::Modified))
    }
}

/// Choose between birth and modification time.
///
/// A birth time at or before the epoch, or later than `now`, is treated as
/// unavailable.
pub fn pick_creation_time(
    birth: Option<SystemTime>,
    modified: SystemTime,
    now: SystemTime,
) -> CreationDate {
    match birth {
        Some(born) if born > UNIX_EPOCH && born <= now => {
            CreationDate::new(born, DateSource::Birth)
        }
        _ => CreationDate::new(modified, DateSource::Modified),
    }
}

/// Selectable resolver variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverKind {
    #[default]
    Birth,
    Modified,
}

impl ResolverKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "birth" | "created" | "creation" => Some(ResolverKind::Birth),
            "modified" | "mtime" => Some(ResolverKind::Modified),
            _ => None,
        }
    }

    pub fn resolver(self) -> Box<dyn DateResolver> {
        match self {
            ResolverKind::Birth => Box::new(BirthTimeResolver),
            ResolverKind::Modified => Box::new(ModifiedTimeResolver),
        }
    }
}
