use semver::Version;

use crate::version::range::RangeSpec;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros.
/// Does NOT strip 'v' prefix.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Lowest version accepted by `spec`, or None when `spec` is not a semver range
pub fn min_satisfying(spec: &str) -> Option<Version> {
    RangeSpec::parse(spec).map(|range| range.min_version())
}

/// Partial order over version specs
///
/// True only when both specs are semver ranges and the lowest version accepted by `a`
/// is below the lowest version accepted by `b`. URLs, tags and catalog references are
/// never lower than anything.
pub fn is_strictly_lower(a: &str, b: &str) -> bool {
    match (min_satisfying(a), min_satisfying(b)) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

/// Extract version prefix (^, ~, >=, <=, >, <, =, v) from a version string
pub fn extract_version_prefix(version: &str) -> &str {
    if version.starts_with(">=") {
        ">="
    } else if version.starts_with("<=") {
        "<="
    } else if version.starts_with('>') {
        ">"
    } else if version.starts_with('<') {
        "<"
    } else if version.starts_with('=') {
        "="
    } else if version.starts_with('^') {
        "^"
    } else if version.starts_with('~') {
        "~"
    } else if version.starts_with('v') {
        "v"
    } else {
        ""
    }
}

/// Carry the range operator of `current` over to a bare `desired` version
///
/// `desired` is returned untouched when it already carries an operator, is not a plain
/// version, or when `current` is a compound range.
pub fn apply_range_prefix(current: &str, desired: &str) -> String {
    let current = current.trim();
    let is_bare =
        desired.starts_with(|c: char| c.is_ascii_digit()) && parse_version(desired).is_some();
    let is_compound = current.contains("||") || current.contains(char::is_whitespace);

    if !is_bare || is_compound {
        return desired.to_string();
    }

    let prefix = extract_version_prefix(current);
    format!("{prefix}{desired}")
}
