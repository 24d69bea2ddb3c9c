//! Include / exclude filter over dependency names and their current specs
//!
//! An expression is a list of patterns separated by commas or whitespace. Each pattern
//! is a literal, a glob using `*`, or a `/regex/` with an optional `i` flag. Name
//! patterns are matched against the dependency name, version patterns against the
//! declared spec text (`^1.2.0`, `~4.17.20`).

use regex::{Regex, RegexBuilder};

use crate::config::{ConfigError, UpgradeConfig};

#[derive(Debug, Clone)]
enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Literal(literal) => literal == name,
            Pattern::Regex(regex) => regex.is_match(name),
        }
    }
}

/// Filter configuration for dependency names and specs
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    /// If non-empty, only these names pass
    include: Vec<Pattern>,
    /// Names that never pass
    exclude: Vec<Pattern>,
    /// If non-empty, only these specs pass
    include_version: Vec<Pattern>,
    /// Specs that never pass
    exclude_version: Vec<Pattern>,
}

impl PackageFilter {
    /// Create a filter that lets every name through
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from optional include and exclude expressions
    pub fn from_expressions(
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut filter = Self::new();
        if let Some(expression) = include {
            filter = filter.with_include(expression)?;
        }
        if let Some(expression) = exclude {
            filter = filter.with_exclude(expression)?;
        }
        Ok(filter)
    }

    /// Build the name and version filters named in `config`
    pub fn from_config(config: &UpgradeConfig) -> Result<Self, ConfigError> {
        let mut filter =
            Self::from_expressions(config.include.as_deref(), config.exclude.as_deref())?;
        if let Some(expression) = config.include_version.as_deref() {
            filter = filter.with_include_version(expression)?;
        }
        if let Some(expression) = config.exclude_version.as_deref() {
            filter = filter.with_exclude_version(expression)?;
        }
        Ok(filter)
    }

    /// Add include patterns
    pub fn with_include(mut self, expression: &str) -> Result<Self, ConfigError> {
        self.include.extend(parse_expression(expression)?);
        Ok(self)
    }

    /// Add exclude patterns
    pub fn with_exclude(mut self, expression: &str) -> Result<Self, ConfigError> {
        self.exclude.extend(parse_expression(expression)?);
        Ok(self)
    }

    /// Add include patterns for specs
    pub fn with_include_version(mut self, expression: &str) -> Result<Self, ConfigError> {
        self.include_version.extend(parse_expression(expression)?);
        Ok(self)
    }

    /// Add exclude patterns for specs
    pub fn with_exclude_version(mut self, expression: &str) -> Result<Self, ConfigError> {
        self.exclude_version.extend(parse_expression(expression)?);
        Ok(self)
    }

    /// Check if a dependency should be processed
    pub fn matches(&self, name: &str) -> bool {
        passes(&self.include, &self.exclude, name)
    }

    /// Check if a dependency currently declared at `spec` should be processed
    pub fn matches_version(&self, spec: &str) -> bool {
        passes(&self.include_version, &self.exclude_version, spec.trim())
    }
}

fn passes(include: &[Pattern], exclude: &[Pattern], value: &str) -> bool {
    if !include.is_empty() && !include.iter().any(|p| p.matches(value)) {
        return false;
    }
    !exclude.iter().any(|p| p.matches(value))
}

fn parse_expression(expression: &str) -> Result<Vec<Pattern>, ConfigError> {
    split_patterns(expression)?
        .into_iter()
        .map(|token| parse_pattern(expression, token))
        .collect()
}

/// Split an expression into pattern tokens; `/.../flags` tokens may contain separators
fn split_patterns(expression: &str) -> Result<Vec<&str>, ConfigError> {
    let is_separator = |c: char| c == ',' || c.is_whitespace();
    let mut tokens = Vec::new();
    let mut rest = expression.trim_start_matches(is_separator);

    while !rest.is_empty() {
        let end = if rest.starts_with('/') {
            let closing = find_regex_end(rest).ok_or_else(|| {
                ConfigError::invalid_filter(expression, "unterminated regular expression")
            })?;
            // Flags run up to the next non-letter
            rest[closing + 1..]
                .find(|c: char| !c.is_ascii_alphabetic())
                .map_or(rest.len(), |i| closing + 1 + i)
        } else {
            rest.find(is_separator).unwrap_or(rest.len())
        };

        tokens.push(&rest[..end]);
        rest = rest[end..].trim_start_matches(is_separator);
    }

    Ok(tokens)
}

/// Byte index of the `/` closing a regex that starts at index 0
fn find_regex_end(token: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in token.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '/' => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_pattern(expression: &str, token: &str) -> Result<Pattern, ConfigError> {
    if let Some(body) = token.strip_prefix('/') {
        let Some(closing) = body.rfind('/') else {
            return Err(ConfigError::invalid_filter(
                expression,
                "unterminated regular expression",
            ));
        };
        let (source, flags) = (&body[..closing], &body[closing + 1..]);
        if let Some(flag) = flags.chars().find(|&c| c != 'i') {
            return Err(ConfigError::invalid_filter(
                expression,
                format!("unsupported regex flag '{flag}'"),
            ));
        }
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .build()
            .map_err(|e| ConfigError::invalid_filter(expression, e.to_string()))?;
        return Ok(Pattern::Regex(regex));
    }

    if token.contains('*') {
        let source = token
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{source}$"))
            .map_err(|e| ConfigError::invalid_filter(expression, e.to_string()))?;
        return Ok(Pattern::Regex(regex));
    }

    Ok(Pattern::Literal(token.to_string()))
}
