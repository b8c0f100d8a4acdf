//! Progress output for user-facing status updates.
//!
//! In verbose mode, output is suppressed since tracing handles everything.
//! In normal mode, each session phase and each operation gets a short line on stderr.

use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::path::Path;

use crate::rename::{OperationStatus, ProgressUpdate};
use crate::scanner::ScanStats;
use crate::session::SessionState;

/// Progress reporter for user-facing output
pub struct Progress {
    writer: Box<dyn Write + Send>,
    /// When true, all output is suppressed (verbose mode uses tracing instead)
    silent: bool,
    /// When true, output is colorized
    colors_enabled: bool,
}

/// Check if we should use colors in output
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    io::stderr().is_terminal()
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Create a new progress reporter writing to stderr
    pub fn new() -> Self {
        Self::new_with_ui(false, should_use_colors())
    }

    /// When `verbose` is set, output is suppressed (tracing handles it)
    pub fn new_with_ui(verbose: bool, colors_enabled: bool) -> Self {
        if !colors_enabled {
            colored::control::set_override(false);
        }
        Self {
            writer: Box::new(io::stderr()),
            silent: verbose,
            colors_enabled,
        }
    }

    /// Create a progress reporter with a custom writer (for testing)
    #[cfg(test)]
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            silent: false,
            colors_enabled: false,
        }
    }

    /// Report a session phase change
    pub fn phase(&mut self, state: SessionState, target: &Path) {
        if self.silent {
            return;
        }
        let line = match state {
            SessionState::Scanning => format!("Scanning {}...", target.display()),
            SessionState::Planning => "Planning renames...".to_string(),
            SessionState::Executing => "Renaming...".to_string(),
            _ => return,
        };
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{}", line.dimmed());
        } else {
            let _ = writeln!(self.writer, "{}", line);
        }
    }

    pub fn scan_complete(&mut self, stats: &ScanStats) {
        if self.silent {
            return;
        }
        let mut line = format!(
            "Found {} files and {} directories",
            stats.files, stats.directories
        );
        if stats.hidden_skipped > 0 {
            line.push_str(&format!(" ({} hidden skipped)", stats.hidden_skipped));
        }
        if stats.excluded > 0 {
            line.push_str(&format!(" ({} excluded)", stats.excluded));
        }
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{}", line.dimmed());
        } else {
            let _ = writeln!(self.writer, "{}", line);
        }
    }

    /// Report progress on a single rename or revert
    pub fn operation(&mut self, update: &ProgressUpdate) {
        if self.silent {
            return;
        }
        let from = update
            .current
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| update.current.display().to_string());
        let to = update.target_name.as_deref().unwrap_or("-");
        let counter = format!("[{}/{}]", update.completed, update.total);

        match update.status {
            OperationStatus::Completed => {
                if self.colors_enabled {
                    let _ = writeln!(
                        self.writer,
                        "{} {} {} {}",
                        counter.cyan(),
                        from.dimmed(),
                        "→".cyan(),
                        to
                    );
                } else {
                    let _ = writeln!(self.writer, "{} {} -> {}", counter, from, to);
                }
            }
            OperationStatus::Skipped => {
                let reason = update.detail.as_deref().unwrap_or("skipped");
                if self.colors_enabled {
                    let _ = writeln!(
                        self.writer,
                        "{} {} {}",
                        counter.cyan(),
                        from.dimmed(),
                        format!("({})", reason).dimmed()
                    );
                } else {
                    let _ = writeln!(self.writer, "{} {} (skipped: {})", counter, from, reason);
                }
            }
            OperationStatus::Failed => {
                let reason = update.detail.as_deref().unwrap_or("failed");
                if self.colors_enabled {
                    let _ = writeln!(
                        self.writer,
                        "{} {} {}",
                        counter.cyan(),
                        from,
                        reason.red()
                    );
                } else {
                    let _ = writeln!(self.writer, "{} {} FAILED: {}", counter, from, reason);
                }
            }
            OperationStatus::Pending | OperationStatus::InProgress => {}
        }
    }

    /// Report rename complete
    pub fn rename_complete(&mut self, count: usize, dry_run: bool) {
        if self.silent {
            return;
        }
        let _ = writeln!(self.writer);
        if dry_run {
            let line = format!("Dry run complete. {} items would be renamed.", count);
            if self.colors_enabled {
                let _ = writeln!(self.writer, "{}", line.dimmed());
            } else {
                let _ = writeln!(self.writer, "{}", line);
            }
        } else if self.colors_enabled {
            let _ = writeln!(
                self.writer,
                "{} {}",
                "✓".green().bold(),
                format!("{} items renamed", count).green()
            );
        } else {
            let _ = writeln!(self.writer, "Rename complete. {} items renamed.", count);
        }
    }

    /// Report an interrupted run
    pub fn cancelled(&mut self, completed: usize) {
        if self.silent {
            return;
        }
        let line = format!("Interrupted. {} items were renamed before stopping.", completed);
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{} {}", "!".yellow().bold(), line.yellow());
        } else {
            let _ = writeln!(self.writer, "{}", line);
        }
    }

    /// Report an error during operation (non-fatal)
    pub fn warn(&mut self, message: &str) {
        if self.silent {
            return;
        }
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{} {}", "!".yellow().bold(), message.yellow());
        } else {
            let _ = writeln!(self.writer, "Warning: {}", message);
        }
    }

    /// Report history file written
    pub fn history_written(&mut self, path: &Path) {
        if self.silent {
            return;
        }
        if self.colors_enabled {
            let _ = writeln!(
                self.writer,
                "{}",
                format!("History saved to: {}", path.display()).dimmed()
            );
        } else {
            let _ = writeln!(self.writer, "History saved to: {}", path.display());
        }
    }

    /// Report starting a revert operation
    pub fn revert_start(&mut self, history_path: &Path) {
        if self.silent {
            return;
        }
        let line = format!("Reverting changes from {}", history_path.display());
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{}", line.bold());
        } else {
            let _ = writeln!(self.writer, "{}", line);
        }
    }

    /// Report revert complete
    pub fn revert_complete(&mut self, count: usize, dry_run: bool) {
        if self.silent {
            return;
        }
        let _ = writeln!(self.writer);
        if dry_run {
            let line = format!("Dry run complete. {} items would be restored.", count);
            if self.colors_enabled {
                let _ = writeln!(self.writer, "{}", line.dimmed());
            } else {
                let _ = writeln!(self.writer, "{}", line);
            }
        } else if self.colors_enabled {
            let _ = writeln!(
                self.writer,
                "{} {}",
                "✓".green().bold(),
                format!("{} items restored", count).green()
            );
        } else {
            let _ = writeln!(self.writer, "Revert complete. {} items restored.", count);
        }
    }
}
