//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Uploaded file names and free text routinely carry candidate contact
//! details; these functions keep them out of shared traces.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@([a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,})").expect("valid regex")
});

/// Masks the local part of every email address in `text`.
///
/// `jane.doe@example.com` → `****@example.com`
pub fn redact_email(text: &str) -> String {
    EMAIL_RE.replace_all(text, "****@$1").into_owned()
}

/// Returns only the last path component of an uploaded file name, with
/// email addresses masked.
///
/// Browsers on some platforms send the full client path as the file name.
pub fn redact_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("<unknown>");
    redact_email(base)
}

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(redact_filename)
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Returns a short deterministic hash for correlating log lines about the
/// same file without exposing its name.
pub fn hash_name(name: &str) -> String {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
