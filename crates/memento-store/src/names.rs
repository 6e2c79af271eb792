//! Ref name validation following git's `check-ref-format` rules.
//!
//! Valid ref names:
//! - Must start with `refs/` and have at least one more component
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Components must be non-empty and must not start with `.`
//! - Must not end with `/`, `.` or `.lock`

use crate::error::{StoreError, StoreResult};

const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> StoreError {
    StoreError::InvalidRefName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a fully qualified ref name such as `refs/notes/memento`.
///
/// ```
/// use memento_store::validate_ref_name;
///
/// assert!(validate_ref_name("refs/notes/memento").is_ok());
/// assert!(validate_ref_name("refs/memento/transcripts").is_ok());
/// assert!(validate_ref_name("memento").is_err());
/// assert!(validate_ref_name("refs/bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> StoreResult<()> {
    let rest = name
        .strip_prefix("refs/")
        .ok_or_else(|| invalid(name, "must start with 'refs/'"))?;
    if rest.is_empty() {
        return Err(invalid(name, "must name something below 'refs/'"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
        }
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with('/') || name.ends_with('.') {
        return Err(invalid(name, "must not end with '/' or '.'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }
    for component in rest.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "must not contain empty components"));
        }
        if component.starts_with('.') {
            return Err(invalid(name, "components must not start with '.'"));
        }
    }
    Ok(())
}
