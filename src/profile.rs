use std::env;

/// A profile SID read from the registry
///
/// Liveness is not stored; it is derived from the account list at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidRecord {
    /// String SID, the profile list subkey name
    pub sid: String,
    /// Unexpanded `ProfileImagePath`, if the registry has one
    pub profile_path: Option<String>,
}

/// Expands `%NAME%` references from the process environment
pub fn expand_env_vars(input: &str) -> String {
    expand_env_vars_with(input, |name| env::var(name).ok())
}

/// Expands `%NAME%` references using `lookup`; unknown names stay verbatim
pub fn expand_env_vars_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('%') {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            expanded.push_str(&rest[start..]);
            return expanded;
        };

        let name = &after[..end];
        match lookup(name).filter(|_| !name.is_empty()) {
            Some(value) => {
                expanded.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                // Keep the opening '%' and retry from the closing one.
                expanded.push('%');
                expanded.push_str(name);
                rest = &after[end..];
            }
        }
    }

    expanded.push_str(rest);
    expanded
}
