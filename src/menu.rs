use colored::Colorize;
use tracing::info;

use crate::{error::AppError, session::Session, shares::admin_share_cleanup, sid_cleanup::orphaned_sid_cleanup};

/// Actions offered by the menu, number first
const MENU_OPTIONS: [&str; 5] = [
    "1: Orphaned SID cleanup",
    "2: Administrative share cleanup",
    "3: Both (SID + admin share cleanup)",
    "4: Toggle dry-run mode",
    "0: Exit",
];

/// One menu action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    SidCleanup,
    ShareCleanup,
    Both,
    ToggleDryRun,
    Exit,
}

impl MenuChoice {
    /// Accepts a bare number or a full option label
    pub fn parse(input: &str) -> Option<Self> {
        match input.split(':').next().unwrap_or_default().trim() {
            "1" => Some(Self::SidCleanup),
            "2" => Some(Self::ShareCleanup),
            "3" => Some(Self::Both),
            "4" => Some(Self::ToggleDryRun),
            "0" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Prints the startup banner
pub fn print_banner(current_sid: Option<&str>) {
    let rule = "===================================================";
    println!("{}", rule.blue());
    println!("{}", "Windows Maintenance: orphaned SIDs & admin shares".bold());
    println!("{}", rule.blue());
    println!("{} {}", "current logged-in user SID:".blue(), current_sid.unwrap_or("unknown"));
    println!("{}", "WARNING: your current account cannot be deleted!".yellow());
    println!("{}", "All deletion operations skip this user automatically.".yellow());
    println!("{}", rule.blue());
}

/// Runs interactive menu interface
pub fn run_menu(session: &mut Session, current_sid: Option<&str>) -> Result<(), AppError> {
    loop {
        println!("{} {}", "current logged-in user SID:".blue(), current_sid.unwrap_or("unknown"));
        let message = format!(
            "select action (dry-run is {})",
            if session.dry_run { "ON" } else { "OFF" }
        );
        let selected: String = session.prompter.select(&message, &MENU_OPTIONS)?;

        match MenuChoice::parse(&selected) {
            Some(MenuChoice::SidCleanup) => {
                orphaned_sid_cleanup(session)?;
            }
            Some(MenuChoice::ShareCleanup) => {
                admin_share_cleanup(session, false)?;
            }
            Some(MenuChoice::Both) => {
                orphaned_sid_cleanup(session)?;
                admin_share_cleanup(session, false)?;
            }
            Some(MenuChoice::ToggleDryRun) => {
                let enabled = session.toggle_dry_run();
                info!("Dry-run mode is now {}", if enabled { "ENABLED" } else { "DISABLED" });
            }
            Some(MenuChoice::Exit) => {
                info!("Exiting.");
                break Ok(());
            }
            None => println!("{}", "invalid choice, please enter 0-4".red()),
        }
    }
}
