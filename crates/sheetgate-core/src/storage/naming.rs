use std::path::Path;

use super::models::DerivedKind;

pub const SESSION_PREFIX_LEN: usize = 12;
const ANONYMOUS_PREFIX: &str = "anon";

/// First twelve ASCII alphanumerics of the session id.
pub fn session_prefix(session_id: &str) -> String {
    let prefix: String = session_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(SESSION_PREFIX_LEN)
        .collect();
    if prefix.is_empty() {
        ANONYMOUS_PREFIX.to_string()
    } else {
        prefix
    }
}

/// `{prefix}_{token}-{hash}.{extension}`
pub fn compose_name(prefix: &str, token: &str, hash_fragment: &str, extension: &str) -> String {
    format!("{}_{}-{}.{}", prefix, token, hash_fragment, extension)
}

/// Base name without its final extension.
pub fn stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

pub fn derived_name(base: &str, kind: DerivedKind) -> String {
    format!("{}{}", stem(base), kind.suffix())
}
