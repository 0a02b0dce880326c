use std::{env, process::ExitCode};

use clap::Parser;
use colored::Colorize;
use tracing::{error, info};

mod accounts;
mod cli;
mod config;
mod elevation;
mod error;
mod logging;
mod menu;
mod profile;
mod prompt;
mod registry;
mod runner;
mod session;
mod shares;
mod sid_cleanup;
mod validation;

#[cfg(test)]
mod testing;

use crate::{
    accounts::get_current_user_sid,
    cli::{Cli, Commands},
    config::{Config, load_config},
    elevation::{ElevationOutcome, SystemElevation, ensure_privileged},
    error::AppError,
    logging::init_logging,
    menu::{print_banner, run_menu},
    prompt::ConsolePrompter,
    registry::RegistryProfileStore,
    runner::SystemRunner,
    session::Session,
    shares::{ShareCleanupReport, admin_share_cleanup},
    sid_cleanup::{SidCleanupReport, orphaned_sid_cleanup},
};

// Main
fn main() -> ExitCode {
    let cli = Cli::parse();

    let args: Vec<String> = env::args().skip(1).collect();
    match ensure_privileged(&SystemElevation, &args) {
        Ok(ElevationOutcome::AlreadyPrivileged) => {}
        Ok(ElevationOutcome::Relaunched) => return ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}. Exiting.", "[ERROR]".red(), err);
            return ExitCode::FAILURE;
        }
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {}", "[ERROR]".red(), err);
            return ExitCode::FAILURE;
        }
    };

    let log_handle = match init_logging(&config) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("{} {}", "[ERROR]".red(), err);
            return ExitCode::FAILURE;
        }
    };

    let code = match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("ERROR: {} (details in {})", err, log_handle.run_log.display());
            ExitCode::FAILURE
        }
    };

    // Flushes and closes the per-run log before exit.
    drop(log_handle);
    code
}

/// Dispatches to the menu or a single procedure
fn run(cli: Cli, config: &Config) -> Result<(), AppError> {
    let runner = SystemRunner;
    let profiles = RegistryProfileStore::new(config.profile_list_key.as_str());
    let mut prompter = ConsolePrompter;
    let mut session = Session::new(config, &runner, &profiles, &mut prompter).with_dry_run(cli.dry_run);

    match cli.command {
        None => {
            let current_sid = get_current_user_sid(&runner);
            print_banner(current_sid.as_deref());
            run_menu(&mut session, current_sid.as_deref())
        }
        Some(Commands::Sids) => {
            log_sid_report(&orphaned_sid_cleanup(&mut session)?);
            Ok(())
        }
        Some(Commands::Shares { force }) => {
            log_share_report(&admin_share_cleanup(&mut session, force)?);
            Ok(())
        }
        Some(Commands::All { force }) => {
            log_sid_report(&orphaned_sid_cleanup(&mut session)?);
            log_share_report(&admin_share_cleanup(&mut session, force)?);
            Ok(())
        }
    }
}

fn log_sid_report(report: &SidCleanupReport) {
    info!(
        "SID cleanup: {} candidates, {} confirmed, {} deleted, {} previewed, {} failed, {} kept{}",
        report.candidates.len(),
        report.confirmed.len(),
        report.deleted().len(),
        report.previewed().len(),
        report.failed().len(),
        report.kept.len(),
        if report.skipped_remaining { ", rest skipped" } else { "" }
    );
    for removal in &report.removals {
        info!("  {}: key {:?}, folder {:?}", removal.sid, removal.key, removal.folder);
    }
}

fn log_share_report(report: &ShareCleanupReport) {
    match &report.backup {
        Some(path) => info!("Share cleanup: {:?}, backup at {}", report.status, path.display()),
        None => info!("Share cleanup: {:?}, no backup", report.status),
    }
}
