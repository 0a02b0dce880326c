//! Disabling of the administrative shares and hardening of IPC$.
//!
//! The procedure always exports the server parameters key first. Every
//! later step logs its command output and carries on regardless of the
//! result; only a failed export (without force), dry-run or a declined
//! confirmation stop it early.

use std::{
    fs, io,
    path::{self, Path, PathBuf},
};

use chrono::Local;
use tracing::{info, warn};

use crate::{
    error::AppError,
    prompt::normalize,
    runner::{CommandOutput, CommandRunner},
    session::Session,
};

/// Values that make the server recreate admin shares at start
const AUTO_SHARE_VALUES: [&str; 2] = ["AutoShareWks", "AutoShareServer"];
/// Share hardened instead of removed
const IPC_SHARE: &str = "IPC$";
const CONFIRM_PROMPT: &str = "Proceed to permanently disable admin shares and delete them now? (yes/no)";

/// How the share cleanup ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareCleanupStatus {
    /// Every step ran
    Completed,
    /// Dry-run stopped after listing shares
    Previewed,
    /// Backup export failed without force
    BackupFailed,
    /// Operator did not confirm
    Declined,
}

/// Result of one share cleanup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareCleanupReport {
    pub status: ShareCleanupStatus,
    /// Registry backup written before any change
    pub backup: Option<PathBuf>,
}

/// Inbound block rule for one protocol and port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    pub name: String,
    pub protocol: &'static str,
    pub port: u16,
}

/// Block rules for every configured port, TCP first
pub fn firewall_rules(ports: &[u16]) -> Vec<FirewallRule> {
    ["TCP", "UDP"]
        .into_iter()
        .flat_map(|protocol| {
            ports.iter().map(move |&port| FirewallRule {
                name: format!("Block SMB {} {}", protocol, port),
                protocol,
                port,
            })
        })
        .collect()
}

/// Exports the server parameters key to a timestamped `.reg` file
pub fn export_registry_backup(session: &Session) -> Result<PathBuf, AppError> {
    fs::create_dir_all(&session.config.backup_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let out_file = backup_file_path(&session.config.backup_dir, &timestamp)?;
    let out_arg = out_file.to_string_lossy().to_string();

    let output = session.runner.run(
        "reg",
        &["export", &session.config.server_parameters_key, &out_arg, "/y"],
    );
    if output.success() {
        Ok(out_file)
    } else {
        Err(AppError::RegistryExport(output.message().to_string()))
    }
}

/// Absolute path of the backup file, so the restore hint works from any directory
pub fn backup_file_path(backup_dir: &Path, timestamp: &str) -> io::Result<PathBuf> {
    Ok(path::absolute(backup_dir)?.join(format!("LanmanServer_Parameters_{}.reg", timestamp)))
}

/// Lists current shares
pub fn list_shares(runner: &dyn CommandRunner) -> CommandOutput {
    runner.run("net", &["share"])
}

/// Writes a DWORD under the server parameters key
pub fn set_registry_dword(session: &Session, name: &str, value: u32) -> CommandOutput {
    let value = value.to_string();
    session.runner.run(
        "reg",
        &[
            "add",
            &session.config.server_parameters_key,
            "/v",
            name,
            "/t",
            "REG_DWORD",
            "/d",
            &value,
            "/f",
        ],
    )
}

/// Removes one share
pub fn delete_share(runner: &dyn CommandRunner, share: &str) -> CommandOutput {
    runner.run("net", &["share", share, "/delete"])
}

/// Stops then starts the server service, returning both outputs
pub fn restart_server_service(session: &Session) -> (CommandOutput, CommandOutput) {
    let service = session.config.server_service.as_str();
    let stop = session.runner.run("sc", &["stop", service]);
    let start = session.runner.run("sc", &["start", service]);
    (stop, start)
}

/// Restricts IPC$ to administrators
pub fn restrict_ipc_permissions(runner: &dyn CommandRunner) -> bool {
    let output = runner.run(
        "net",
        &[
            "share",
            IPC_SHARE,
            "/grant:Administrators,FULL",
            "/REMARK:Restricted to Admins only",
        ],
    );
    if output.success() {
        info!("IPC$ share permissions restricted to Administrators.");
    } else {
        warn!("Failed to restrict IPC$: {}", output.message());
    }
    output.success()
}

/// Adds the inbound block rules, returning how many were applied
pub fn block_smb_ports(session: &Session) -> usize {
    let mut applied = 0;
    for rule in firewall_rules(&session.config.blocked_ports) {
        let args = firewall_args(&rule);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = session.runner.run("netsh", &args);
        if output.success() {
            info!("Firewall rule applied: {}", rule.name);
            applied += 1;
        } else {
            warn!("Failed to apply firewall rule {}: {}", rule.name, output.message());
        }
    }
    applied
}

fn firewall_args(rule: &FirewallRule) -> Vec<String> {
    vec![
        "advfirewall".to_string(),
        "firewall".to_string(),
        "add".to_string(),
        "rule".to_string(),
        format!("name={}", rule.name),
        "dir=in".to_string(),
        "action=block".to_string(),
        format!("protocol={}", rule.protocol),
        format!("localport={}", rule.port),
    ]
}

/// Runs the administrative share cleanup
///
/// # Arguments
/// * `session` - Dry-run flag, config and seams
/// * `force` - Skip confirmation and continue past a failed backup
pub fn admin_share_cleanup(session: &mut Session, force: bool) -> Result<ShareCleanupReport, AppError> {
    info!("=== Administrative Share Cleanup ===");
    info!("Dry-run mode is {}", if session.dry_run { "enabled" } else { "disabled" });

    info!("=== Backup registry (LanmanServer Parameters) ===");
    let backup = match export_registry_backup(session) {
        Ok(path) => {
            info!("Registry exported to: {}", path.display());
            Some(path)
        }
        Err(err) => {
            warn!("Failed to export registry: {}", err);
            if !force {
                warn!("Aborting.");
                return Ok(ShareCleanupReport {
                    status: ShareCleanupStatus::BackupFailed,
                    backup: None,
                });
            }
            None
        }
    };

    info!("=== Current shares (before) ===");
    log_share_listing(&list_shares(session.runner));

    if session.dry_run {
        info!("Dry-run enabled. No changes will be made.");
        preview_changes(session);
        return Ok(ShareCleanupReport {
            status: ShareCleanupStatus::Previewed,
            backup,
        });
    }

    if !force {
        let answer = session.prompter.text(CONFIRM_PROMPT)?;
        if !matches!(normalize(&answer).as_str(), "y" | "yes") {
            info!("Aborted by operator.");
            return Ok(ShareCleanupReport {
                status: ShareCleanupStatus::Declined,
                backup,
            });
        }
    }

    info!("=== Setting registry values to prevent auto-creation of admin shares ===");
    for name in AUTO_SHARE_VALUES {
        let output = set_registry_dword(session, name, 0);
        if output.success() {
            info!("Set {} = 0", name);
        } else {
            warn!("Failed to set {}: {}", name, output.message());
        }
    }

    info!("=== Removing administrative shares ===");
    for share in &session.config.admin_shares {
        let output = delete_share(session.runner, share);
        if output.success() {
            info!("Removed share: {}", share);
        } else {
            let combined = output.combined();
            let detail = if combined.is_empty() { "(no output, maybe not present)" } else { combined.as_str() };
            warn!("{}: {}", share, detail);
        }
    }

    info!("=== Restarting {} to apply registry changes ===", session.config.server_service);
    let (stop, start) = restart_server_service(session);
    info!("sc stop output:\n{}", stop.combined());
    info!("sc start output:\n{}", start.combined());

    info!("=== Hardening IPC$ share ===");
    restrict_ipc_permissions(session.runner);
    block_smb_ports(session);

    info!("=== Current shares (after) ===");
    log_share_listing(&list_shares(session.runner));

    info!("=== Finished ===");
    match &backup {
        Some(path) => {
            info!("A registry backup was saved at: {}", path.display());
            info!("To restore previous registry settings, run:");
            info!("  {}", restore_command(path));
            info!("Then restart the Server service ({}) or reboot the machine.", session.config.server_service);
        }
        None => info!("No registry backup path available (export failed earlier)."),
    }

    Ok(ShareCleanupReport {
        status: ShareCleanupStatus::Completed,
        backup,
    })
}

/// Command that re-imports a backup
pub fn restore_command(backup: &Path) -> String {
    format!("reg import \"{}\"", backup.display())
}

fn log_share_listing(output: &CommandOutput) {
    if output.success() {
        info!("{}", output.stdout.trim());
    } else {
        warn!("{}", output.message());
    }
}

/// Logs each change a real run would make
fn preview_changes(session: &Session) {
    for name in AUTO_SHARE_VALUES {
        info!("[dry-run] Would set {} = 0 under {}", name, session.config.server_parameters_key);
    }
    for share in &session.config.admin_shares {
        info!("[dry-run] Would delete share: {}", share);
    }
    info!("[dry-run] Would restart service: {}", session.config.server_service);
    info!("[dry-run] Would restrict {} to Administrators", IPC_SHARE);
    for rule in firewall_rules(&session.config.blocked_ports) {
        info!("[dry-run] Would add firewall rule: {}", rule.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        testing::{MemoryProfileStore, ScriptedPrompter, ScriptedRunner, capture_logs},
    };

    const NOT_PRESENT: &str = "This shared resource does not exist.";

    fn config_in(dir: &Path) -> Config {
        Config {
            backup_dir: dir.join("reg_backups"),
            ..Config::default()
        }
    }

    /// Command lines that change system state
    fn mutations(runner: &ScriptedRunner) -> Vec<String> {
        runner
            .calls()
            .into_iter()
            .filter(|line| !line.starts_with("reg export") && line != "net share")
            .collect()
    }

    #[test]
    fn rules_cover_both_protocols_and_ports() {
        let names: Vec<String> = firewall_rules(&[445, 139]).into_iter().map(|rule| rule.name).collect();
        assert_eq!(
            names,
            vec!["Block SMB TCP 445", "Block SMB TCP 139", "Block SMB UDP 445", "Block SMB UDP 139"]
        );
    }

    #[test]
    fn relative_backup_dir_becomes_absolute() {
        let path = backup_file_path(Path::new("reg_backups"), "20260101_120000").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with(Path::new("reg_backups").join("LanmanServer_Parameters_20260101_120000.reg")));

        let hint = restore_command(&path);
        assert!(hint.starts_with("reg import \""));
        assert!(hint.contains(&path.display().to_string()));
    }

    #[test]
    fn failed_export_without_force_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = ScriptedRunner::new().fail("reg export", "ERROR: Access is denied.");
        let store = MemoryProfileStore::default();
        let mut prompter = ScriptedPrompter::new(["yes"]);
        let mut session = Session::new(&config, &runner, &store, &mut prompter);

        let (report, logs) = capture_logs(|| admin_share_cleanup(&mut session, false).unwrap());
        assert_eq!(report.status, ShareCleanupStatus::BackupFailed);
        assert_eq!(report.backup, None);
        assert_eq!(runner.calls().len(), 1);
        assert!(mutations(&runner).is_empty());
        assert!(logs.contains("Failed to export registry"));
        assert!(logs.contains("Access is denied"));
        assert_eq!(prompter.asked(), 0);
    }

    #[test]
    fn failed_export_with_force_continues() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = ScriptedRunner::new().fail("reg export", "ERROR");
        let store = MemoryProfileStore::default();
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let mut session = Session::new(&config, &runner, &store, &mut prompter);

        let (report, logs) = capture_logs(|| admin_share_cleanup(&mut session, true).unwrap());
        assert_eq!(report.status, ShareCleanupStatus::Completed);
        assert_eq!(report.backup, None);
        assert_eq!(runner.count("reg add"), 2);
        assert!(logs.contains("No registry backup path available"));
    }

    #[test]
    fn dry_run_lists_shares_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = ScriptedRunner::new().respond("net share", "Share name   Resource\r\nC$   C:\\\r\n");
        let store = MemoryProfileStore::default();
        let mut prompter = ScriptedPrompter::new(["yes"]);
        let mut session = Session::new(&config, &runner, &store, &mut prompter).with_dry_run(true);

        let (report, logs) = capture_logs(|| admin_share_cleanup(&mut session, false).unwrap());
        assert_eq!(report.status, ShareCleanupStatus::Previewed);
        let backup = report.backup.unwrap();
        assert!(backup.is_absolute());
        let file_name = backup.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("LanmanServer_Parameters_"));
        assert!(file_name.ends_with(".reg"));
        assert!(dir.path().join("reg_backups").is_dir());

        assert_eq!(runner.count("net share"), 1);
        assert!(mutations(&runner).is_empty());
        assert!(logs.contains("Dry-run enabled"));
        assert!(logs.contains("[dry-run] Would delete share: ADMIN$"));
        assert!(logs.contains("[dry-run] Would add firewall rule: Block SMB UDP 139"));
        assert_eq!(prompter.asked(), 0);
    }

    #[test]
    fn declining_confirmation_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = ScriptedRunner::new();
        let store = MemoryProfileStore::default();
        let mut prompter = ScriptedPrompter::new(["nah"]);
        let mut session = Session::new(&config, &runner, &store, &mut prompter);

        let report = admin_share_cleanup(&mut session, false).unwrap();
        assert_eq!(report.status, ShareCleanupStatus::Declined);
        assert!(report.backup.is_some());
        assert!(mutations(&runner).is_empty());
    }

    #[test]
    fn confirmed_run_issues_every_step_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            admin_shares: vec!["C$".to_string(), "ADMIN$".to_string()],
            ..config_in(dir.path())
        };
        let runner = ScriptedRunner::new();
        let store = MemoryProfileStore::default();
        let mut prompter = ScriptedPrompter::new(["Y"]);
        let mut session = Session::new(&config, &runner, &store, &mut prompter);

        let (report, logs) = capture_logs(|| admin_share_cleanup(&mut session, false).unwrap());
        assert_eq!(report.status, ShareCleanupStatus::Completed);

        let key = &config.server_parameters_key;
        assert_eq!(
            mutations(&runner),
            vec![
                format!("reg add {key} /v AutoShareWks /t REG_DWORD /d 0 /f"),
                format!("reg add {key} /v AutoShareServer /t REG_DWORD /d 0 /f"),
                "net share C$ /delete".to_string(),
                "net share ADMIN$ /delete".to_string(),
                "sc stop lanmanserver".to_string(),
                "sc start lanmanserver".to_string(),
                "net share IPC$ /grant:Administrators,FULL /REMARK:Restricted to Admins only".to_string(),
                "netsh advfirewall firewall add rule name=Block SMB TCP 445 dir=in action=block protocol=TCP localport=445"
                    .to_string(),
                "netsh advfirewall firewall add rule name=Block SMB TCP 139 dir=in action=block protocol=TCP localport=139"
                    .to_string(),
                "netsh advfirewall firewall add rule name=Block SMB UDP 445 dir=in action=block protocol=UDP localport=445"
                    .to_string(),
                "netsh advfirewall firewall add rule name=Block SMB UDP 139 dir=in action=block protocol=UDP localport=139"
                    .to_string(),
            ]
        );
        assert_eq!(runner.count("net share"), 5);

        let backup = report.backup.unwrap();
        assert!(logs.contains(&restore_command(&backup)));
    }

    #[test]
    fn absent_shares_are_not_fatal_twice() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = ScriptedRunner::new()
            .with_output(
                "net share C$",
                CommandOutput {
                    code: 2,
                    stdout: String::new(),
                    stderr: NOT_PRESENT.to_string(),
                },
            )
            .fail("net share D$", "");
        let store = MemoryProfileStore::default();
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let mut session = Session::new(&config, &runner, &store, &mut prompter);

        for _ in 0..2 {
            let (report, logs) = capture_logs(|| admin_share_cleanup(&mut session, true).unwrap());
            assert_eq!(report.status, ShareCleanupStatus::Completed);
            assert!(logs.contains(&format!("C$: {}", NOT_PRESENT)));
            assert!(logs.contains("D$: (no output, maybe not present)"));
            assert!(logs.contains("Removed share: ADMIN$"));
        }
        assert_eq!(runner.count("net share C$ /delete"), 2);
        assert_eq!(runner.count("sc start"), 2);
        assert_eq!(runner.count("netsh"), 8);
    }

    #[test]
    fn failed_hardening_steps_do_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let runner = ScriptedRunner::new()
            .fail("reg add", "ERROR: Access is denied.")
            .fail("sc stop", "[SC] OpenService FAILED 5")
            .fail("net share IPC$", "System error 5 has occurred.")
            .fail("netsh", "The requested operation requires elevation");
        let store = MemoryProfileStore::default();
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let mut session = Session::new(&config, &runner, &store, &mut prompter);

        let (report, logs) = capture_logs(|| admin_share_cleanup(&mut session, true).unwrap());
        assert_eq!(report.status, ShareCleanupStatus::Completed);
        assert!(logs.contains("Failed to set AutoShareServer"));
        assert!(logs.contains("Failed to restrict IPC$"));
        assert!(logs.contains("Failed to apply firewall rule Block SMB UDP 139"));
        assert!(logs.contains("OpenService FAILED 5"));
        assert_eq!(runner.count("sc start"), 1);
        assert_eq!(block_smb_ports(&session), 0);
    }
}
