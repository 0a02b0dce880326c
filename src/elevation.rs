use colored::Colorize;

use crate::error::AppError;

/// Administrator privilege check and elevated relaunch
pub trait Elevation {
    /// Whether the process already runs as administrator
    fn is_privileged(&self) -> bool;
    /// Starts an elevated copy of this executable with `args`, returning
    /// whether the request was accepted
    fn relaunch_privileged(&self, args: &[String]) -> bool;
}

/// Result of [`ensure_privileged`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationOutcome {
    /// Continue in this process
    AlreadyPrivileged,
    /// An elevated copy took over; this process should exit
    Relaunched,
}

/// Makes sure the work happens with administrator rights
pub fn ensure_privileged(elevation: &dyn Elevation, args: &[String]) -> Result<ElevationOutcome, AppError> {
    if elevation.is_privileged() {
        return Ok(ElevationOutcome::AlreadyPrivileged);
    }

    println!("{}", "[INFO] Attempting to restart with Administrator privileges...".yellow());
    if elevation.relaunch_privileged(args) {
        Ok(ElevationOutcome::Relaunched)
    } else {
        Err(AppError::Elevation("could not elevate to Administrator".to_string()))
    }
}

/// Joins arguments into one command line, quoting those with whitespace or quotes
///
/// Quoted arguments follow the `CommandLineToArgvW` rules: backslashes
/// before a quote or before the closing quote are doubled.
pub fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() {
                "\"\"".to_string()
            } else if arg.chars().any(|ch| ch.is_whitespace() || ch == '"') {
                quote_arg(arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for ch in arg.chars() {
        match ch {
            '\\' => backslashes += 1,
            '"' => {
                quoted.push_str(&"\\".repeat(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.push_str(&"\\".repeat(backslashes));
                quoted.push(ch);
                backslashes = 0;
            }
        }
    }
    quoted.push_str(&"\\".repeat(backslashes * 2));
    quoted.push('"');
    quoted
}

/// Elevation through the Windows shell
pub struct SystemElevation;

#[cfg(windows)]
impl Elevation for SystemElevation {
    fn is_privileged(&self) -> bool {
        unsafe { windows_sys::Win32::UI::Shell::IsUserAnAdmin() != 0 }
    }

    fn relaunch_privileged(&self, args: &[String]) -> bool {
        match shell_execute_runas(&quote_args(args)) {
            Ok(()) => true,
            Err(err) => {
                eprintln!("{} Failed to elevate privileges: {}", "[ERROR]".red(), err);
                false
            }
        }
    }
}

#[cfg(windows)]
fn shell_execute_runas(parameters: &str) -> Result<(), AppError> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::UI::{Shell::ShellExecuteW, WindowsAndMessaging::SW_SHOWNORMAL};

    fn wide_null(value: &OsStr) -> Vec<u16> {
        value.encode_wide().chain(std::iter::once(0)).collect()
    }

    let exe = std::env::current_exe()?;
    let exe_w = wide_null(exe.as_os_str());
    let verb = wide_null(OsStr::new("runas"));
    let params = wide_null(OsStr::new(parameters));

    let res = unsafe {
        ShellExecuteW(
            std::ptr::null_mut(),
            verb.as_ptr(),
            exe_w.as_ptr(),
            params.as_ptr(),
            std::ptr::null(),
            SW_SHOWNORMAL,
        )
    } as isize;
    if res <= 32 {
        return Err(AppError::Elevation(format!("ShellExecuteW failed with code {}", res)));
    }
    Ok(())
}

#[cfg(not(windows))]
impl Elevation for SystemElevation {
    fn is_privileged(&self) -> bool {
        false
    }

    fn relaunch_privileged(&self, _args: &[String]) -> bool {
        eprintln!("{} Elevation is only supported on Windows", "[ERROR]".red());
        false
    }
}
