use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::manifest::section::DeclarationSection;

// =============================================================================
// Upgrade-related constants
// =============================================================================

/// Default number of desired-version lookups in flight
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Sections scanned when the configuration does not name any
pub const DEFAULT_SECTIONS: [DeclarationSection; 5] = [
    DeclarationSection::Dependencies,
    DeclarationSection::DevDependencies,
    DeclarationSection::OptionalDependencies,
    DeclarationSection::PackageManager,
    DeclarationSection::Resolutions,
];

/// Default `RUST_LOG` filter for the binary
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Fatal configuration problems, reported before any file is touched
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid filter expression '{expression}': {message}")]
    InvalidFilter { expression: String, message: String },

    #[error("Unknown declaration section: {0}")]
    InvalidSection(String),
}

impl ConfigError {
    pub fn invalid_filter(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// Upgrade configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpgradeConfig {
    /// Sections scanned, in priority order
    pub sections: Vec<DeclarationSection>,
    /// Only upgrade names matching one of these expressions
    pub include: Option<String>,
    /// Never upgrade names matching one of these expressions
    pub exclude: Option<String>,
    /// Only upgrade dependencies whose current spec matches one of these expressions
    pub include_version: Option<String>,
    /// Never upgrade dependencies whose current spec matches one of these expressions
    pub exclude_version: Option<String>,
    /// Names of packages owned by the workspace
    pub workspace_packages: Vec<String>,
    /// Reuse the current range operator when the desired spec is a bare version
    pub keep_range_prefix: bool,
    /// Max in-flight desired-version lookups
    pub concurrency: usize,
    pub dry_run: bool,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            sections: DEFAULT_SECTIONS.to_vec(),
            include: None,
            exclude: None,
            include_version: None,
            exclude_version: None,
            workspace_packages: Vec::new(),
            keep_range_prefix: false,
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
        }
    }
}

impl UpgradeConfig {
    /// Lookup concurrency, never below one
    pub fn lookup_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Returns the path to the data directory for catalog-bump.
/// Uses $XDG_DATA_HOME/catalog-bump if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/catalog-bump,
/// or ./catalog-bump if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("catalog-bump.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("catalog-bump")
}
