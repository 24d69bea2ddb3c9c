//! Common types for document parsers

use std::path::Path;

/// Structural family of a patchable file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// Comment-preserving block markup (pnpm-workspace.yaml)
    BlockStructured,
    /// Delimiter-structured data (package.json)
    Delimited,
}

impl FileFormat {
    /// Returns the string representation of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::BlockStructured => "yaml",
            FileFormat::Delimited => "json",
        }
    }
}

/// Detect the file format based on the file extension
pub fn detect_format(path: &Path) -> Option<FileFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Some(FileFormat::BlockStructured),
        Some("json") => Some(FileFormat::Delimited),
        _ => None,
    }
}

/// How a scalar leaf is delimited in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Unquoted YAML scalar; the span covers the whole token
    Plain,
    /// YAML `'...'`; the span excludes the quotes
    Single,
    /// YAML `"..."`; the span excludes the quotes
    Double,
    /// JSON string; the span excludes the quotes
    Json,
}

/// A scalar value located in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Unquoted value
    pub value: String,
    /// Byte offset of the replaceable span (start)
    pub start_offset: usize,
    /// Byte offset of the replaceable span (end)
    pub end_offset: usize,
    pub quoting: Quoting,
}

impl Leaf {
    /// Encode `value` so that it can replace this leaf's span verbatim
    pub fn encode(&self, value: &str) -> String {
        match self.quoting {
            Quoting::Json => {
                let quoted = serde_json::Value::String(value.to_string()).to_string();
                quoted[1..quoted.len() - 1].to_string()
            }
            Quoting::Double => value.replace('\\', "\\\\").replace('"', "\\\""),
            Quoting::Single => value.replace('\'', "''"),
            Quoting::Plain if needs_yaml_quotes(value) => {
                format!("'{}'", value.replace('\'', "''"))
            }
            Quoting::Plain => value.to_string(),
        }
    }
}

/// Whether a plain YAML scalar would be misread or rejected without quotes
fn needs_yaml_quotes(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%',
        '@', '`',
    ];

    let Some(first) = value.chars().next() else {
        return true;
    };

    INDICATORS.contains(&first)
        || value != value.trim()
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || resolves_to_non_string(value)
}

/// Whether a plain scalar would load as null, a boolean or a number
fn resolves_to_non_string(value: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "~", "null", "true", "false", "yes", "no", "on", "off", "y", "n", ".inf", "+.inf",
        ".nan",
    ];

    let lower = value.to_ascii_lowercase();
    if KEYWORDS.contains(&lower.as_str()) {
        return true;
    }

    let digits = lower.replace('_', "");
    let unsigned = digits.strip_prefix('+').unwrap_or(&digits);
    if let Some(hex) = unsigned.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(octal) = unsigned.strip_prefix("0o") {
        return !octal.is_empty() && octal.chars().all(|c| c.is_digit(8));
    }
    unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && unsigned.parse::<f64>().is_ok()
}

/// A single byte-range replacement
#[derive(Debug, Clone, PartialEq, Eq)]
struct TextEdit {
    start_offset: usize,
    end_offset: usize,
    new_text: String,
}

/// Replacements collected against one parse of a document
///
/// Offsets always refer to the original text, so edits never invalidate each other.
#[derive(Debug, Clone, Default)]
pub struct PendingEdits {
    edits: Vec<TextEdit>,
}

impl PendingEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a replacement; a second edit for an already queued span is ignored
    pub fn push(&mut self, start_offset: usize, end_offset: usize, new_text: String) -> bool {
        let overlaps = self
            .edits
            .iter()
            .any(|e| start_offset < e.end_offset && e.start_offset < end_offset);
        if overlaps {
            return false;
        }
        self.edits.push(TextEdit {
            start_offset,
            end_offset,
            new_text,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Produce the patched text
    pub fn apply(&self, content: &str) -> String {
        let mut edits: Vec<&TextEdit> = self.edits.iter().collect();
        edits.sort_by_key(|e| e.start_offset);

        let mut result = String::with_capacity(content.len());
        let mut cursor = 0;
        for edit in edits {
            result.push_str(&content[cursor..edit.start_offset]);
            result.push_str(&edit.new_text);
            cursor = edit.end_offset;
        }
        result.push_str(&content[cursor..]);
        result
    }
}
