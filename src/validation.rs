use validator::ValidateLength;

use crate::{config::Config, error::AppError};

/// Maximum length of a Windows share name
const MAX_SHARE_NAME_LENGTH: u64 = 80;
/// Prefix every string SID carries
const SID_PREFIX: &str = "S-1-";

/// Validates every user-supplied field of the config
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    for share in &config.admin_shares {
        validate_share_name(share)?;
    }
    for port in &config.blocked_ports {
        validate_port(*port)?;
    }
    for sid in &config.protected_sids {
        validate_sid(sid)?;
    }
    if config.server_service.trim().is_empty() {
        return Err(AppError::Validation("server service name cannot be empty".to_string()));
    }
    Ok(())
}

/// Validates a share name
pub fn validate_share_name(name: &str) -> Result<(), AppError> {
    if !name.validate_length(Some(1), Some(MAX_SHARE_NAME_LENGTH), None) {
        Err(AppError::Validation(format!(
            "share name '{}' must be 1 to {} characters",
            name, MAX_SHARE_NAME_LENGTH
        )))
    } else if name.chars().any(char::is_whitespace) {
        Err(AppError::Validation(format!("share name '{}' contains whitespace", name)))
    } else {
        Ok(())
    }
}

/// Validates a firewall port
pub fn validate_port(port: u16) -> Result<(), AppError> {
    if port == 0 {
        Err(AppError::Validation("port 0 cannot be blocked".to_string()))
    } else {
        Ok(())
    }
}

/// Validates a string SID
pub fn validate_sid(sid: &str) -> Result<(), AppError> {
    if !sid.starts_with(SID_PREFIX) || sid.len() == SID_PREFIX.len() {
        Err(AppError::Validation(format!("'{}' is not a SID", sid)))
    } else {
        Ok(())
    }
}
