use tracing::{info, warn};

use crate::runner::{CommandOutput, CommandRunner};

/// Queries listing every account with its SID, tried in order
const ACCOUNT_QUERIES: [(&str, &[&str]); 2] = [
    ("wmic", &["useraccount", "get", "name,sid"]),
    (
        "powershell",
        &[
            "-NoProfile",
            "-Command",
            "Get-CimInstance -ClassName Win32_UserAccount | ForEach-Object { $_.Name + ' ' + $_.SID }",
        ],
    ),
];

/// Resolves the SID of the logged-in account
pub fn get_current_user_sid(runner: &dyn CommandRunner) -> Option<String> {
    let output = runner.run("whoami", &["/user", "/fo", "csv", "/nh"]);
    if !output.success() {
        warn!("Error getting current user SID: {}", output.message());
        return None;
    }

    let sid = parse_whoami_sid(&output.stdout);
    if sid.is_none() {
        warn!("Error getting current user SID: unexpected output {:?}", output.stdout.trim());
    }
    sid
}

/// Extracts the SID column of `whoami /user /fo csv /nh`
fn parse_whoami_sid(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    let sid = line.rsplit(',').next()?.trim().trim_matches('"');
    sid.starts_with("S-").then(|| sid.to_string())
}

/// Checks whether any local account carries `sid`
///
/// When no account query succeeds the answer is `!unknown_is_orphan`, so
/// with the default policy an unverifiable SID is offered to the operator
/// as an orphan rather than silently kept.
pub fn account_exists(runner: &dyn CommandRunner, sid: &str, unknown_is_orphan: bool) -> bool {
    match query_accounts(runner) {
        Some(listing) => listing.lines().any(|line| line.split_whitespace().any(|word| word == sid)),
        None => {
            warn!(
                "Could not verify account for {}; treating it as {}",
                sid,
                if unknown_is_orphan { "orphaned" } else { "existing" }
            );
            !unknown_is_orphan
        }
    }
}

fn query_accounts(runner: &dyn CommandRunner) -> Option<String> {
    for (program, args) in ACCOUNT_QUERIES {
        let output: CommandOutput = runner.run(program, args);
        if output.success() {
            return Some(output.stdout);
        }
        info!("Account query via {} failed: {}", program, output.message());
    }
    None
}
