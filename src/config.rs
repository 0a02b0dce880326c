use std::{env, fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{error::AppError, validation::validate_config};

/// Config file in user's home directory
const GLOBAL_CONFIG_FILE: &str = ".winmaint.json";
/// Environment variable overriding the config file location
const CONFIG_PATH_ENV: &str = "WINMAINT_CONFIG";

/// Tunables for both cleanup procedures
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Profile list key, relative to HKLM
    pub profile_list_key: String,
    /// Root every deletable profile folder must live under
    pub profile_root: Option<PathBuf>,
    /// Server service parameters key, with hive prefix as `reg.exe` expects
    pub server_parameters_key: String,
    /// Name of the file sharing service
    pub server_service: String,
    /// Shares removed by the share cleanup
    pub admin_shares: Vec<String>,
    /// Ports blocked inbound for TCP and UDP
    pub blocked_ports: Vec<u16>,
    /// Directory for per-run log files
    pub log_dir: PathBuf,
    /// Directory for registry backups
    pub backup_dir: PathBuf,
    /// SIDs never offered for deletion
    pub protected_sids: Vec<String>,
    /// Whether a failed account query marks a SID as orphaned
    pub unknown_account_is_orphan: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_list_key: r"SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileList".to_string(),
            profile_root: None,
            server_parameters_key: r"HKLM\SYSTEM\CurrentControlSet\Services\LanmanServer\Parameters"
                .to_string(),
            server_service: "lanmanserver".to_string(),
            admin_shares: ["C$", "D$", "E$", "F$", "ADMIN$"].map(String::from).to_vec(),
            blocked_ports: vec![445, 139],
            log_dir: PathBuf::from("logs"),
            backup_dir: PathBuf::from("reg_backups"),
            protected_sids: ["S-1-5-18", "S-1-5-19", "S-1-5-20"].map(String::from).to_vec(),
            unknown_account_is_orphan: true,
        }
    }
}

impl Config {
    /// Canonical per-user profile root, `<SystemDrive>\Users` unless configured
    pub fn profile_root(&self) -> PathBuf {
        if let Some(root) = &self.profile_root {
            return root.clone();
        }
        let drive = env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        PathBuf::from(format!("{drive}\\")).join("Users")
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home_dir: PathBuf = dirs::home_dir().ok_or_else(|| {
        AppError::Validation("failed to find the home directory".to_string())
    })?;
    Ok(home_dir.join(GLOBAL_CONFIG_FILE))
}

/// Loads the config file, falling back to defaults when it is absent
pub fn load_config() -> Result<Config, AppError> {
    let path = get_config_path()?;
    load_config_from(&path)
}

/// Loads and validates config from an explicit path
pub fn load_config_from(path: &std::path::Path) -> Result<Config, AppError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let file_contents = fs::read_to_string(path)?;
    if file_contents.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_json::from_str(&file_contents)?;
    validate_config(&config)?;
    Ok(config)
}
