use std::path::Path;

use clap::Parser;
use dateprefix::cli::Args;
use dateprefix::config::{config_from_env, expand_home, RenamerConfig};
use dateprefix::history::write_history;
use dateprefix::output::{
    display_dry_run, display_execution_result, display_json, display_rollback_result,
    RollbackReport, SessionReport,
};
use dateprefix::progress::{should_use_colors, Progress};
use dateprefix::rollback::{rollback_from_history, RollbackOptions};
use dateprefix::session::{Session, SessionEvent};
use dateprefix::{logging, AppError};
use tracing::{debug, error, info, warn};

fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(args.verbose);

    debug!("Environment loaded");

    if let Err(e) = run(args) {
        error!("{}", e);
        eprintln!("\nError: {}", e.detailed_message());
        std::process::exit(e.exit_code().into());
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let config = config_from_env().merge_args(&args);
    debug!(?config, "Configuration resolved");

    let mut progress = Progress::new_with_ui(args.verbose > 0, should_use_colors());

    if let Some(history_file) = &args.revert {
        info!("Revert mode: {:?}", history_file);
        return run_revert(&expand_home(history_file), &args, &mut progress);
    }

    let target_dir = args
        .target_dir
        .as_deref()
        .map(expand_home)
        .ok_or_else(|| AppError::InvalidArgument {
            message: "No target directory given".to_string(),
        })?;

    run_rename(&target_dir, &args, &config, &mut progress)
}

fn run_rename(
    target_dir: &Path,
    args: &Args,
    config: &RenamerConfig,
    progress: &mut Progress,
) -> Result<(), AppError> {
    let handle = Session::new(target_dir, config.session_options(args.dry)).spawn();

    let token = handle.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let result = handle.wait_with(|event| match event {
        SessionEvent::State(state) => progress.phase(*state, target_dir),
        SessionEvent::Progress(update) => progress.operation(update),
        SessionEvent::Finished(_) => {}
    })?;

    progress.scan_complete(&result.scan_stats);
    if result.is_cancelled() {
        progress.cancelled(result.renamed_count);
    } else {
        progress.rename_complete(result.renamed_count, args.dry);
    }

    let mut history_error = None;
    let mut history_path = None;
    if !args.dry && config.write_history && !result.rollback_log.is_empty() {
        match write_history(&result) {
            Ok(path) => {
                progress.history_written(&path);
                history_path = Some(path);
            }
            Err(e) => {
                progress.warn(&format!("Could not save history: {}", e));
                history_error = Some(e);
            }
        }
    }

    let stdout = &mut std::io::stdout();
    let displayed = if args.json {
        display_json(&SessionReport::new(&result, history_path.as_deref()), stdout)
    } else if args.dry {
        display_dry_run(&result, stdout)
    } else {
        display_execution_result(&result, stdout)
    };
    displayed.map_err(|e| AppError::Other(format!("Failed to display output: {}", e)))?;

    if let Some(e) = history_error {
        return Err(e.into());
    }
    if result.is_cancelled() {
        return Err(AppError::Cancelled {
            completed: result.renamed_count,
            total: result.operations.len(),
        });
    }
    if result.failed_count > 0 {
        return Err(AppError::PartialFailure {
            failed: result.failed_count,
            total: result.operations.len(),
        });
    }

    Ok(())
}

fn run_revert(history_file: &Path, args: &Args, progress: &mut Progress) -> Result<(), AppError> {
    progress.revert_start(history_file);

    let options = RollbackOptions { dry_run: args.dry };
    let result = rollback_from_history(history_file, &options, &mut |update| {
        progress.operation(update)
    })
    .map_err(|e| match AppError::from(e) {
        AppError::HistoryError { message, .. } => AppError::HistoryError {
            path: Some(history_file.to_path_buf()),
            message,
        },
        other => other,
    })?;

    progress.revert_complete(result.restored.len(), result.dry_run);
    if let Some(path) = &result.revert_history_path {
        progress.history_written(path);
    }

    let stdout = &mut std::io::stdout();
    let displayed = if args.json {
        display_json(&RollbackReport::new(&result), stdout)
    } else {
        display_rollback_result(&result, stdout)
    };
    displayed.map_err(|e| AppError::Other(format!("Failed to display output: {}", e)))?;

    if !result.is_clean() {
        return Err(AppError::PartialFailure {
            failed: result.unrecoverable.len(),
            total: result.restored.len() + result.unrecoverable.len(),
        });
    }

    Ok(())
}
