pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod output;
pub mod prefix;
pub mod progress;
pub mod rename;
pub mod resolver;
pub mod rollback;
pub mod scanner;
pub mod session;

pub use config::{config_from_env, RenamerConfig};
pub use error::{AppError, ExitCode};
pub use prefix::{format_prefix, has_prefix, parse_prefix, NamePlatform, NameRules};
pub use rename::{
    CancelToken, OperationKind, OperationStatus, ProgressUpdate, RenameOperation, RollbackEntry,
    SkipReason,
};
pub use resolver::{
    BirthTimeResolver, CreationDate, DateError, DateResolver, DateSource, ModifiedTimeResolver,
    ResolverKind,
};
pub use rollback::{
    rollback, rollback_entries, rollback_from_history, RollbackError, RollbackOptions,
    RollbackResult,
};
pub use scanner::{scan_tree, Entry, EntryKind, ScanOptions, ScanReport, ScannerError};
pub use session::{
    cancel, run_session, Session, SessionError, SessionEvent, SessionHandle, SessionOptions,
    SessionResult, SessionState,
};
