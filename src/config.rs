use std::env;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::cli::Args;
use crate::prefix::NameRules;
use crate::resolver::ResolverKind;
use crate::scanner::ScanOptions;
use crate::session::SessionOptions;

/// Environment variable names for renamer configuration
pub const ENV_MAX_LENGTH: &str = "DATEPREFIX_MAX_LENGTH";
pub const ENV_INCLUDE_HIDDEN: &str = "DATEPREFIX_INCLUDE_HIDDEN";
pub const ENV_NO_HISTORY: &str = "DATEPREFIX_NO_HISTORY";
pub const ENV_DATE_SOURCE: &str = "DATEPREFIX_DATE_SOURCE";
pub const ENV_EXCLUDE: &str = "DATEPREFIX_EXCLUDE";
pub const ENV_EXTENSIONS: &str = "DATEPREFIX_EXTENSIONS";
pub const ENV_MAX_DEPTH: &str = "DATEPREFIX_MAX_DEPTH";

pub const DEFAULT_MAX_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamerConfig {
    pub max_length: usize,
    pub include_hidden: bool,
    pub write_history: bool,
    pub date_source: ResolverKind,
    pub exclude_patterns: Vec<String>,
    pub extensions: Vec<String>,
    pub max_depth: Option<usize>,
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            include_hidden: false,
            write_history: true,
            date_source: ResolverKind::Birth,
            exclude_patterns: Vec::new(),
            extensions: Vec::new(),
            max_depth: None,
        }
    }
}

impl RenamerConfig {
    /// Command-line flags win over the environment
    pub fn merge_args(mut self, args: &Args) -> Self {
        if let Some(max_length) = args.max_length {
            self.max_length = max_length;
        }
        if args.include_hidden {
            self.include_hidden = true;
        }
        if args.no_history {
            self.write_history = false;
        }
        if args.mtime {
            self.date_source = ResolverKind::Modified;
        }
        if !args.exclude.is_empty() {
            self.exclude_patterns = args.exclude.clone();
        }
        if !args.extensions.is_empty() {
            self.extensions = args.extensions.clone();
        }
        if args.max_depth.is_some() {
            self.max_depth = args.max_depth;
        }
        self
    }

    pub fn session_options(&self, dry_run: bool) -> SessionOptions {
        SessionOptions {
            dry_run,
            scan: ScanOptions {
                include_hidden: self.include_hidden,
                exclude_patterns: self.exclude_patterns.clone(),
                extensions: self.extensions.clone(),
                max_depth: self.max_depth,
            },
            name_rules: NameRules {
                max_length: self.max_length,
                ..NameRules::default()
            },
            date_source: self.date_source,
        }
    }
}

/// Load renamer configuration from environment variables
///
/// Recognized variables:
/// - `DATEPREFIX_MAX_LENGTH`: longest allowed name after prefixing
/// - `DATEPREFIX_INCLUDE_HIDDEN`: also rename dot-files
/// - `DATEPREFIX_NO_HISTORY`: skip writing the history file
/// - `DATEPREFIX_DATE_SOURCE`: `birth` or `modified`
/// - `DATEPREFIX_EXCLUDE`: comma-separated glob patterns to skip
/// - `DATEPREFIX_EXTENSIONS`: comma-separated extensions for top-level files
/// - `DATEPREFIX_MAX_DEPTH`: deepest level to descend into
///
/// These can be set in a `.env` file in the working directory.
pub fn config_from_env() -> RenamerConfig {
    let defaults = RenamerConfig::default();

    let max_length = env::var(ENV_MAX_LENGTH)
        .ok()
        .and_then(|v| match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                warn!("Ignoring invalid {}={:?}", ENV_MAX_LENGTH, v);
                None
            }
        })
        .unwrap_or(defaults.max_length);

    let date_source = env::var(ENV_DATE_SOURCE)
        .ok()
        .and_then(|v| {
            let kind = ResolverKind::parse(&v);
            if kind.is_none() {
                warn!("Ignoring invalid {}={:?}", ENV_DATE_SOURCE, v);
            }
            kind
        })
        .unwrap_or(defaults.date_source);

    let max_depth = env::var(ENV_MAX_DEPTH)
        .ok()
        .and_then(|v| match v.trim().parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Ignoring invalid {}={:?}", ENV_MAX_DEPTH, v);
                None
            }
        });

    RenamerConfig {
        max_length,
        include_hidden: env_flag(ENV_INCLUDE_HIDDEN).unwrap_or(defaults.include_hidden),
        write_history: !env_flag(ENV_NO_HISTORY).unwrap_or(!defaults.write_history),
        date_source,
        exclude_patterns: env_list(ENV_EXCLUDE),
        extensions: env_list(ENV_EXTENSIONS),
        max_depth,
    }
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => {
            warn!("Ignoring invalid {}={:?}", name, value);
            None
        }
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
