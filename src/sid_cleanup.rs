//! Interactive removal of profile SIDs whose account no longer exists.
//!
//! Candidates never include the operator's own SID or a protected service
//! SID. Each candidate is confirmed on its own; a confirmed candidate loses
//! its profile list key and, if every path guard passes, its folder.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    accounts::{account_exists, get_current_user_sid},
    error::AppError,
    profile::{SidRecord, expand_env_vars},
    prompt::{normalize, prompt_until_valid},
    registry::{get_profile_path, list_profile_sids},
    session::Session,
};

const DECISION_PROMPT: &str = "Delete this SID and its profile? (yes/NO/skip all remaining)";
const DECISION_HINT: &str = "please enter 'yes', 'no', or 'skip all remaining'";

/// Operator answer for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidDecision {
    Delete,
    Keep,
    SkipRemaining,
}

impl SidDecision {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize(input).as_str() {
            "yes" => Some(Self::Delete),
            "no" => Some(Self::Keep),
            "skip all remaining" => Some(Self::SkipRemaining),
            _ => None,
        }
    }
}

/// What happened to a profile list key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Deleted,
    Previewed,
    RefusedCurrentUser,
    NotFound,
    AccessDenied,
    Failed,
}

/// What happened to a profile folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOutcome {
    Deleted,
    Previewed,
    NoPath,
    Missing,
    OutsideProfileRoot,
    CurrentUserProfile,
    /// The folder is a symlink or junction
    Link,
    Failed,
}

/// What happened to one confirmed candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidRemoval {
    pub sid: String,
    pub key: KeyOutcome,
    pub folder: FolderOutcome,
}

/// Summary of one cleanup pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SidCleanupReport {
    /// Orphaned SIDs, in registry order
    pub candidates: Vec<String>,
    /// SIDs the operator confirmed for deletion
    pub confirmed: Vec<String>,
    /// Key and folder outcome of every confirmed SID
    pub removals: Vec<SidRemoval>,
    /// SIDs the operator kept
    pub kept: Vec<String>,
    /// Set when the operator skipped all remaining candidates
    pub skipped_remaining: bool,
}

impl SidCleanupReport {
    /// Confirmed SIDs whose profile list key was actually removed
    pub fn deleted(&self) -> Vec<&str> {
        self.removals
            .iter()
            .filter(|removal| removal.key == KeyOutcome::Deleted)
            .map(|removal| removal.sid.as_str())
            .collect()
    }

    /// Confirmed SIDs only previewed in dry-run
    pub fn previewed(&self) -> Vec<&str> {
        self.removals
            .iter()
            .filter(|removal| removal.key == KeyOutcome::Previewed)
            .map(|removal| removal.sid.as_str())
            .collect()
    }

    /// Confirmed SIDs whose key could not be removed
    pub fn failed(&self) -> Vec<&str> {
        self.removals
            .iter()
            .filter(|removal| !matches!(removal.key, KeyOutcome::Deleted | KeyOutcome::Previewed))
            .map(|removal| removal.sid.as_str())
            .collect()
    }
}

/// Classifies registry SIDs, keeping those with no live account
///
/// The current user's SID and protected SIDs are never returned.
pub fn find_orphaned_sids(session: &Session, current_sid: Option<&str>) -> Vec<String> {
    let sids: Vec<String> = list_profile_sids(session.profiles);
    info!("Found {} SIDs in profile list.", sids.len());

    sids.into_iter()
        .filter(|sid| {
            if current_sid == Some(sid.as_str()) {
                info!("Skipping current user SID: {}", sid);
                return false;
            }
            if session.config.protected_sids.iter().any(|protected| protected == sid) {
                info!("Skipping protected SID: {}", sid);
                return false;
            }
            !account_exists(session.runner, sid, session.config.unknown_account_is_orphan)
        })
        .collect()
}

/// Runs the interactive orphaned SID cleanup
pub fn orphaned_sid_cleanup(session: &mut Session) -> Result<SidCleanupReport, AppError> {
    info!("=== Orphaned SID Cleanup ===");
    let current_sid: Option<String> = get_current_user_sid(session.runner);
    match current_sid.as_deref() {
        Some(sid) => info!("Current user SID: {}", sid),
        None => {
            warn!("WARNING: current user SID could not be determined!");
            warn!("The current user's registry key and profile folder are NOT protected in this run.");
            warn!("Answer 'no' for any SID that belongs to the logged-in account.");
        }
    }

    let mut report = SidCleanupReport {
        candidates: find_orphaned_sids(session, current_sid.as_deref()),
        ..SidCleanupReport::default()
    };
    info!("Detected {} orphaned SIDs (excluding current user).", report.candidates.len());

    for sid in report.candidates.clone() {
        let record = SidRecord {
            profile_path: get_profile_path(session.profiles, &sid),
            sid,
        };
        info!("Orphaned SID: {}", record.sid);
        info!("Profile folder: {}", record.profile_path.as_deref().unwrap_or("(none)"));

        let decision = prompt_until_valid(&mut *session.prompter, DECISION_PROMPT, DECISION_HINT, SidDecision::parse)?;
        match decision {
            SidDecision::Delete => {
                let key = delete_registry_sid(session, &record.sid, current_sid.as_deref());
                let folder = delete_profile_folder(session, record.profile_path.as_deref(), current_sid.as_deref());
                report.removals.push(SidRemoval {
                    sid: record.sid.clone(),
                    key,
                    folder,
                });
                report.confirmed.push(record.sid);
            }
            SidDecision::Keep => {
                info!("Skipped deletion of SID: {}", record.sid);
                report.kept.push(record.sid);
            }
            SidDecision::SkipRemaining => {
                info!("Operator chose to skip all remaining orphaned SIDs.");
                report.skipped_remaining = true;
                return Ok(report);
            }
        }
    }

    info!(
        "Orphaned SID cleanup completed: {} confirmed, {} deleted, {} kept.",
        report.confirmed.len(),
        report.deleted().len(),
        report.kept.len()
    );
    Ok(report)
}

/// Deletes the profile list key of `sid`, never the current user's
pub fn delete_registry_sid(session: &Session, sid: &str, current_sid: Option<&str>) -> KeyOutcome {
    if current_sid == Some(sid) {
        warn!("Refusing to delete the current user's SID from registry!");
        return KeyOutcome::RefusedCurrentUser;
    }

    let key = session.profiles.key_display(sid);
    if session.dry_run {
        info!("[dry-run] Would delete registry key: {}", key);
        return KeyOutcome::Previewed;
    }

    match session.profiles.delete_profile_key(sid) {
        Ok(()) => {
            info!("Deleted registry key: {}", key);
            KeyOutcome::Deleted
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("SID registry key not found: {}", key);
            KeyOutcome::NotFound
        }
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            warn!("Permission denied deleting registry key {}: {}", key, err);
            KeyOutcome::AccessDenied
        }
        Err(err) => {
            warn!("Error deleting registry key {}: {}", key, err);
            KeyOutcome::Failed
        }
    }
}

/// Deletes a profile folder if it exists, lies strictly under the profile
/// root and is not the current user's own folder
pub fn delete_profile_folder(session: &Session, path: Option<&str>, current_sid: Option<&str>) -> FolderOutcome {
    let Some(path) = path else {
        info!("No profile path provided.");
        return FolderOutcome::NoPath;
    };

    let expanded = expand_env_vars(path);
    let folder = Path::new(&expanded);
    if !folder.exists() {
        info!("Profile folder does not exist: {}", expanded);
        return FolderOutcome::Missing;
    }

    match fs::symlink_metadata(folder) {
        Ok(metadata) if is_link(&metadata) => {
            warn!("Refusing to delete a linked profile folder: {}", expanded);
            return FolderOutcome::Link;
        }
        Ok(_) => {}
        Err(err) => {
            warn!("Error reading profile folder {}: {}", expanded, err);
            return FolderOutcome::Failed;
        }
    }

    let resolved: PathBuf = match folder.canonicalize() {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!("Error resolving profile folder {}: {}", expanded, err);
            return FolderOutcome::Failed;
        }
    };

    let root = session.config.profile_root();
    if !is_strictly_under(&resolved, &root) {
        warn!("Refusing to delete folder outside {}: {}", root.display(), expanded);
        return FolderOutcome::OutsideProfileRoot;
    }

    if let Some(current) = current_profile_folder(session, current_sid) {
        if current == resolved {
            warn!("Refusing to delete current user's profile folder!");
            return FolderOutcome::CurrentUserProfile;
        }
    }

    if session.dry_run {
        info!("[dry-run] Would delete profile folder: {}", expanded);
        return FolderOutcome::Previewed;
    }

    match fs::remove_dir_all(folder) {
        Ok(()) => {
            info!("Deleted profile folder: {}", expanded);
            FolderOutcome::Deleted
        }
        Err(err) => {
            warn!("Error deleting profile folder {}: {}", expanded, err);
            FolderOutcome::Failed
        }
    }
}

/// Symlinks, junctions and any other reparse point
fn is_link(metadata: &fs::Metadata) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;

        const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
        if metadata.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0 {
            return true;
        }
    }
    metadata.file_type().is_symlink()
}

/// Resolved folder of the current user, when it can be determined
fn current_profile_folder(session: &Session, current_sid: Option<&str>) -> Option<PathBuf> {
    let stored = get_profile_path(session.profiles, current_sid?)?;
    Path::new(&expand_env_vars(&stored)).canonicalize().ok()
}

/// True when `path` is below `root`, never equal to it
fn is_strictly_under(path: &Path, root: &Path) -> bool {
    match root.canonicalize() {
        Ok(root) => path != root && path.starts_with(&root),
        Err(_) => false,
    }
}
