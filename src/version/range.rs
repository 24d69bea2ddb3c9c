//! npm range grammar
//!
//! Supports the range forms found in package.json and catalog entries:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact version
//! - `^1.2.3`, `~1.2.3` - caret and tilde ranges
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `1.*`, `*`, `x` - wildcards
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - `>=1.0.0 <2.0.0` - AND (space separated), `^1.0.0 || ^2.0.0` - OR
//!
//! Anything else (URLs, git refs, dist-tags, `workspace:`/`catalog:` protocols) does not parse.

use semver::Version;

use crate::version::semver::parse_version;

/// Top-level range specification
/// Handles compound ranges (AND, OR) as well as simple ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// Single comparator (^1.0.0, >=1.0.0, etc.)
    Single(Comparator),
    /// AND of ranges (>=1.0.0 <2.0.0) - space-separated, all must satisfy
    And(Vec<RangeSpec>),
    /// OR of specs (^1.0.0 || ^2.0.0) - any must satisfy
    Or(Vec<RangeSpec>),
}

impl RangeSpec {
    /// Parse a version specification string
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }

        // OR has the lowest precedence
        if spec.contains("||") {
            let specs: Option<Vec<RangeSpec>> = spec
                .split("||")
                .map(|part| Self::parse_and_or_single(part.trim()))
                .collect();
            return specs.map(RangeSpec::Or);
        }

        Self::parse_and_or_single(spec)
    }

    /// Parse a spec that may be AND (space-separated) or a single range
    fn parse_and_or_single(spec: &str) -> Option<Self> {
        if spec.is_empty() {
            return None;
        }

        if Comparator::parse_hyphen(spec).is_some() {
            return Comparator::parse(spec).map(RangeSpec::Single);
        }

        let parts = split_and_parts(spec);
        match parts.as_slice() {
            [] => None,
            [single] => Comparator::parse(single).map(RangeSpec::Single),
            _ => {
                let ranges: Option<Vec<RangeSpec>> = parts
                    .iter()
                    .map(|p| Comparator::parse(p).map(RangeSpec::Single))
                    .collect();
                ranges.map(RangeSpec::And)
            }
        }
    }

    /// Lowest version this spec accepts
    ///
    /// AND takes the highest lower bound of its parts, OR the lowest of its alternatives.
    pub fn min_version(&self) -> Version {
        match self {
            RangeSpec::Single(comparator) => comparator.min_version(),
            RangeSpec::And(specs) => specs
                .iter()
                .map(RangeSpec::min_version)
                .max()
                .unwrap_or_else(zero),
            RangeSpec::Or(specs) => specs
                .iter()
                .map(RangeSpec::min_version)
                .min()
                .unwrap_or_else(zero),
        }
    }
}

/// Split spec into AND parts, gluing detached operators (`>= 1.0.0`) to their operand
fn split_and_parts(spec: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut pending_operator: Option<&str> = None;

    for token in spec.split_whitespace() {
        if is_bare_operator(token) {
            pending_operator = Some(token);
            continue;
        }
        match pending_operator.take() {
            Some(operator) => parts.push(format!("{operator}{token}")),
            None => parts.push(token.to_string()),
        }
    }

    // A trailing operator without operand never parses
    if let Some(operator) = pending_operator {
        parts.push(operator.to_string());
    }
    parts
}

fn is_bare_operator(token: &str) -> bool {
    matches!(token, ">=" | "<=" | ">" | "<" | "=" | "^" | "~" | "~>")
}

fn zero() -> Version {
    Version::new(0, 0, 0)
}

/// Smallest release above `v`, carrying into minor when patch is exhausted
fn next_patch(v: &Version) -> Version {
    match v.patch.checked_add(1) {
        Some(patch) => Version::new(v.major, v.minor, patch),
        None => Version::new(v.major, v.minor.saturating_add(1), 0),
    }
}

/// A single npm comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    /// Exact version match
    Exact(Version),
    /// Caret range: ^1.2.3 means >=1.2.3 <2.0.0 (or special cases for 0.x)
    Caret(Version),
    /// Tilde range: ~1.2.3 means >=1.2.3 <1.3.0
    Tilde(Version),
    Gte(Version),
    Gt(Version),
    Lte(Version),
    Lt(Version),
    /// Any version: `*`, `x` or `X`
    Any,
    /// Wildcard major: 1.x means >=1.0.0 <2.0.0
    WildcardMajor(u64),
    /// Wildcard minor: 1.2.x means >=1.2.0 <1.3.0
    WildcardMinor(u64, u64),
    /// Hyphen range: 1.0.0 - 2.0.0 means >=1.0.0 <=2.0.0
    Hyphen { from: Version, to: Version },
}

impl Comparator {
    /// Parse a single comparator
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();

        if let Some(range) = Self::parse_hyphen(spec) {
            return Some(range);
        }

        if let Some(rest) = spec.strip_prefix(">=") {
            parse_bound(rest).map(Comparator::Gte)
        } else if let Some(rest) = spec.strip_prefix('>') {
            parse_bound(rest).map(Comparator::Gt)
        } else if let Some(rest) = spec.strip_prefix("<=") {
            parse_bound(rest).map(Comparator::Lte)
        } else if let Some(rest) = spec.strip_prefix('<') {
            parse_bound(rest).map(Comparator::Lt)
        } else if let Some(rest) = spec.strip_prefix('^') {
            parse_bound(rest).map(Comparator::Caret)
        } else if let Some(rest) = spec.strip_prefix("~>") {
            parse_bound(rest).map(Comparator::Tilde)
        } else if let Some(rest) = spec.strip_prefix('~') {
            parse_bound(rest).map(Comparator::Tilde)
        } else if let Some(rest) = spec.strip_prefix('=') {
            Self::parse_plain(rest)
        } else {
            Self::parse_plain(spec)
        }
    }

    /// Parse a version without operator: exact or wildcard
    fn parse_plain(spec: &str) -> Option<Self> {
        let spec = strip_v(spec.trim());
        if is_wildcard(spec) {
            Some(Comparator::Any)
        } else if let Some(range) = Self::parse_wildcard(spec) {
            Some(range)
        } else {
            parse_version(spec).map(Comparator::Exact)
        }
    }

    /// Parse hyphen range like "1.0.0 - 2.0.0"
    fn parse_hyphen(spec: &str) -> Option<Self> {
        let parts: Vec<&str> = spec.split(" - ").collect();
        let [from, to] = parts.as_slice() else {
            return None;
        };

        let from = parse_bound(from)?;
        let to = parse_bound(to)?;

        Some(Comparator::Hyphen { from, to })
    }

    /// Parse wildcard patterns like "1.x", "1.2.x" or "1.x.x"
    fn parse_wildcard(spec: &str) -> Option<Self> {
        let parts: Vec<&str> = spec.split('.').collect();

        match parts.as_slice() {
            [major, x] | [major, x, _] if is_wildcard(x) => {
                major.parse::<u64>().ok().map(Comparator::WildcardMajor)
            }
            [major, minor, x] if is_wildcard(x) => {
                let major = major.parse::<u64>().ok()?;
                let minor = minor.parse::<u64>().ok()?;
                Some(Comparator::WildcardMinor(major, minor))
            }
            _ => None,
        }
    }

    /// Lowest version this comparator accepts
    pub fn min_version(&self) -> Version {
        match self {
            Comparator::Exact(v)
            | Comparator::Caret(v)
            | Comparator::Tilde(v)
            | Comparator::Gte(v) => v.clone(),
            Comparator::Gt(v) if v.pre.is_empty() => next_patch(v),
            Comparator::Gt(v) => Version::new(v.major, v.minor, v.patch),
            Comparator::Lte(_) | Comparator::Lt(_) | Comparator::Any => zero(),
            Comparator::WildcardMajor(major) => Version::new(*major, 0, 0),
            Comparator::WildcardMinor(major, minor) => Version::new(*major, *minor, 0),
            Comparator::Hyphen { from, .. } => from.clone(),
        }
    }
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "*" | "x" | "X")
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// Parse the operand of an operator; wildcard components count as zero
fn parse_bound(operand: &str) -> Option<Version> {
    let operand = strip_v(operand.trim());
    if let Some(version) = parse_version(operand) {
        return Some(version);
    }

    match Comparator::parse_wildcard(operand)? {
        Comparator::WildcardMajor(major) => Some(Version::new(major, 0, 0)),
        Comparator::WildcardMinor(major, minor) => Some(Version::new(major, minor, 0)),
        _ => Some(zero()),
    }
}
