//! Scan → plan → execute pipeline over one target directory.
//!
//! A [`Session`] is a caller-owned value that runs exactly once. It can run
//! on the caller's thread ([`Session::run`]) or on a single worker thread
//! ([`Session::spawn`]) that reports back through a channel.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info};

use crate::prefix::NameRules;
use crate::rename::{
    execute_operations, plan_operations, CancelToken, OperationStatus, PlanError, ProgressUpdate,
    RenameOperation, RollbackEntry,
};
use crate::resolver::{DateResolver, ResolverKind};
use crate::scanner::{scan_tree, ScanOptions, ScanStats, ScannerError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Scan(#[from] ScannerError),

    #[error("Target directory is empty: {0}")]
    EmptyDirectory(PathBuf),

    #[error("Planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Session has already run")]
    AlreadyRun,

    #[error("Session worker terminated unexpectedly")]
    WorkerLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Scanning,
    Planning,
    Executing,
    Completed,
    Cancelled,
    FatalError,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::FatalError
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub dry_run: bool,
    pub scan: ScanOptions,
    pub name_rules: NameRules,
    pub date_source: ResolverKind,
}

/// Final, read-only outcome of a session
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub target_dir: PathBuf,
    pub status: SessionState,
    pub dry_run: bool,
    pub discovered_count: usize,
    pub renamed_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub operations: Vec<RenameOperation>,
    /// Completed renames in completion order
    pub rollback_log: Vec<RollbackEntry>,
    pub scan_stats: ScanStats,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl SessionResult {
    pub fn failed(&self) -> impl Iterator<Item = &RenameOperation> {
        self.operations
            .iter()
            .filter(|op| op.status == OperationStatus::Failed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &RenameOperation> {
        self.operations
            .iter()
            .filter(|op| op.status == OperationStatus::Skipped)
    }

    pub fn completed(&self) -> impl Iterator<Item = &RenameOperation> {
        self.operations
            .iter()
            .filter(|op| op.status == OperationStatus::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SessionState::Cancelled
    }
}

/// Notifications from a spawned session
#[derive(Debug)]
pub enum SessionEvent {
    State(SessionState),
    Progress(ProgressUpdate),
    /// Always the last event
    Finished(Result<SessionResult, SessionError>),
}

pub struct Session {
    target_dir: PathBuf,
    options: SessionOptions,
    resolver: Box<dyn DateResolver>,
    state: SessionState,
    started: bool,
}

impl Session {
    pub fn new(target_dir: impl Into<PathBuf>, options: SessionOptions) -> Self {
        let resolver = options.date_source.resolver();
        Self {
            target_dir: target_dir.into(),
            options,
            resolver,
            state: SessionState::Scanning,
            started: false,
        }
    }

    /// Replace the date resolver selected by the options
    pub fn with_resolver(mut self, resolver: Box<dyn DateResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Run the whole pipeline on the current thread
    pub fn run(
        &mut self,
        on_progress: &mut dyn FnMut(&ProgressUpdate),
        cancel: &CancelToken,
    ) -> Result<SessionResult, SessionError> {
        self.run_with_events(&mut |_| {}, on_progress, cancel)
    }

    fn run_with_events(
        &mut self,
        on_state: &mut dyn FnMut(SessionState),
        on_progress: &mut dyn FnMut(&ProgressUpdate),
        cancel: &CancelToken,
    ) -> Result<SessionResult, SessionError> {
        if self.started {
            return Err(SessionError::AlreadyRun);
        }
        self.started = true;

        let result = self.pipeline(on_state, on_progress, cancel);
        if result.is_err() {
            self.transition(SessionState::FatalError, on_state);
        }
        result
    }

    fn pipeline(
        &mut self,
        on_state: &mut dyn FnMut(SessionState),
        on_progress: &mut dyn FnMut(&ProgressUpdate),
        cancel: &CancelToken,
    ) -> Result<SessionResult, SessionError> {
        let started_at = Local::now();
        info!(path = ?self.target_dir, dry_run = self.options.dry_run, "Session started");

        on_state(SessionState::Scanning);
        let report = scan_tree(&self.target_dir, self.resolver.as_ref(), &self.options.scan)?;
        if report.is_empty() {
            return Err(SessionError::EmptyDirectory(self.target_dir.clone()));
        }
        info!(count = report.entries.len(), "Discovered entries");

        self.transition(SessionState::Planning, on_state);
        let mut operations =
            plan_operations(&report.root, &report.entries, &self.options.name_rules)?;

        self.transition(SessionState::Executing, on_state);
        let outcome =
            execute_operations(&mut operations, self.options.dry_run, on_progress, cancel);

        let status = if outcome.cancelled {
            SessionState::Cancelled
        } else {
            SessionState::Completed
        };
        self.transition(status, on_state);

        let count = |status: OperationStatus| {
            operations
                .iter()
                .filter(|op| op.status == status)
                .count()
        };
        let renamed_count = count(OperationStatus::Completed);
        let skipped_count = count(OperationStatus::Skipped);
        let failed_count = count(OperationStatus::Failed);

        let result = SessionResult {
            target_dir: self.target_dir.clone(),
            status,
            dry_run: self.options.dry_run,
            discovered_count: report.entries.len(),
            renamed_count,
            skipped_count,
            failed_count,
            rollback_log: outcome.rollback_log,
            operations,
            scan_stats: report.stats,
            started_at,
            finished_at: Local::now(),
        };

        info!(
            status = ?result.status,
            renamed = result.renamed_count,
            skipped = result.skipped_count,
            failed = result.failed_count,
            "Session finished"
        );

        Ok(result)
    }

    fn transition(&mut self, next: SessionState, on_state: &mut dyn FnMut(SessionState)) {
        debug!(from = ?self.state, to = ?next, "Session state change");
        self.state = next;
        on_state(next);
    }

    /// Run the pipeline on one worker thread
    pub fn spawn(mut self) -> SessionHandle {
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, events) = mpsc::channel();

        let worker = thread::spawn(move || {
            let progress_tx = tx.clone();
            let state_tx = tx.clone();
            let result = self.run_with_events(
                &mut |state| {
                    let _ = state_tx.send(SessionEvent::State(state));
                },
                &mut |update| {
                    let _ = progress_tx.send(SessionEvent::Progress(update.clone()));
                },
                &worker_cancel,
            );
            let _ = tx.send(SessionEvent::Finished(result));
        });

        SessionHandle {
            cancel,
            events,
            worker,
        }
    }
}

/// Caller's side of a spawned session
pub struct SessionHandle {
    cancel: CancelToken,
    events: Receiver<SessionEvent>,
    worker: JoinHandle<()>,
}

impl SessionHandle {
    /// Ask the worker to stop before its next operation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block until the session finishes, passing every other event to `on_event`
    pub fn wait_with(
        self,
        mut on_event: impl FnMut(&SessionEvent),
    ) -> Result<SessionResult, SessionError> {
        let mut finished = None;
        for event in self.events.iter() {
            match event {
                SessionEvent::Finished(result) => {
                    finished = Some(result);
                    break;
                }
                other => on_event(&other),
            }
        }

        if self.worker.join().is_err() {
            return Err(SessionError::WorkerLost);
        }
        finished.unwrap_or(Err(SessionError::WorkerLost))
    }

    pub fn wait(self) -> Result<SessionResult, SessionError> {
        self.wait_with(|_| {})
    }
}

/// Cancel a spawned session
pub fn cancel(handle: &SessionHandle) {
    handle.cancel();
}

/// Run a session with default options on a worker and wait for it
pub fn run_session(target_dir: &Path, dry_run: bool) -> Result<SessionResult, SessionError> {
    let options = SessionOptions {
        dry_run,
        ..SessionOptions::default()
    };
    Session::new(target_dir, options).spawn().wait()
}
