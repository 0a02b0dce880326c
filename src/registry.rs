//! Access to the profile list key, where Windows maps every profile SID to
//! its folder.
//!
//! All callers go through [`ProfileStore`] so the cleanup logic never needs
//! a real registry. Read failures are logged and collapsed into "nothing
//! found" here; delete failures are returned so the caller can tell a
//! missing key from a denied one.

use std::io;

use tracing::warn;

/// Value under each SID subkey holding the profile folder
#[cfg_attr(not(windows), allow(dead_code))]
pub const PROFILE_PATH_VALUE: &str = "ProfileImagePath";

/// Registry view of local profiles
pub trait ProfileStore {
    /// Child key names of the profile list key
    fn profile_sids(&self) -> io::Result<Vec<String>>;
    /// Raw `ProfileImagePath` of one SID, `None` when key or value is missing
    fn profile_image_path(&self, sid: &str) -> io::Result<Option<String>>;
    /// Removes one SID subkey
    fn delete_profile_key(&self, sid: &str) -> io::Result<()>;
    /// Full key path of a SID, for log lines
    fn key_display(&self, sid: &str) -> String;
}

/// Lists profile SIDs, logging and swallowing any access error
pub fn list_profile_sids(store: &dyn ProfileStore) -> Vec<String> {
    match store.profile_sids() {
        Ok(sids) => sids,
        Err(err) => {
            warn!("Error reading profile list: {}", err);
            Vec::new()
        }
    }
}

/// Looks up the stored profile path of a SID
pub fn get_profile_path(store: &dyn ProfileStore, sid: &str) -> Option<String> {
    match store.profile_image_path(sid) {
        Ok(path) => path,
        Err(err) => {
            warn!("Error reading profile path of {}: {}", sid, err);
            None
        }
    }
}

/// Profile list backed by the local machine hive
pub struct RegistryProfileStore {
    /// Key path relative to HKLM
    key_path: String,
}

impl RegistryProfileStore {
    pub fn new(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }
}

#[cfg(windows)]
impl RegistryProfileStore {
    fn open(&self, flags: u32) -> io::Result<winreg::RegKey> {
        use winreg::RegKey;
        use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_WOW64_64KEY};

        RegKey::predef(HKEY_LOCAL_MACHINE).open_subkey_with_flags(&self.key_path, flags | KEY_WOW64_64KEY)
    }
}

#[cfg(windows)]
impl ProfileStore for RegistryProfileStore {
    fn profile_sids(&self) -> io::Result<Vec<String>> {
        use winreg::enums::KEY_READ;

        self.open(KEY_READ)?.enum_keys().collect()
    }

    fn profile_image_path(&self, sid: &str) -> io::Result<Option<String>> {
        use winreg::enums::KEY_READ;

        let subkey = match self.open(KEY_READ)?.open_subkey(sid) {
            Ok(subkey) => subkey,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        match subkey.get_value::<String, _>(PROFILE_PATH_VALUE) {
            Ok(path) => Ok(Some(path)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn delete_profile_key(&self, sid: &str) -> io::Result<()> {
        use winreg::enums::KEY_WRITE;

        self.open(KEY_WRITE)?.delete_subkey(sid)
    }

    fn key_display(&self, sid: &str) -> String {
        format!("HKLM\\{}\\{}", self.key_path, sid)
    }
}

#[cfg(not(windows))]
impl ProfileStore for RegistryProfileStore {
    fn profile_sids(&self) -> io::Result<Vec<String>> {
        Err(unsupported())
    }

    fn profile_image_path(&self, _sid: &str) -> io::Result<Option<String>> {
        Err(unsupported())
    }

    fn delete_profile_key(&self, _sid: &str) -> io::Result<()> {
        Err(unsupported())
    }

    fn key_display(&self, sid: &str) -> String {
        format!("HKLM\\{}\\{}", self.key_path, sid)
    }
}

#[cfg(not(windows))]
fn unsupported() -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, "the registry is only available on Windows")
}
