//! Effective current version per dependency of a manifest
//!
//! When a name is declared in several sections, the lowest comparable spec wins so that
//! an unrelated higher pin never hides a needed upgrade. Ties and incomparable pairs
//! (URLs, tags) keep the value seen first in section order.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::catalog::reference::is_catalog_reference;
use crate::config::{ConfigError, UpgradeConfig};
use crate::manifest::filter::PackageFilter;
use crate::manifest::package_json::Manifest;
use crate::manifest::section::DeclarationSection;
use crate::version::semver::is_strictly_lower;

/// Protocol of internal workspace cross-references
const WORKSPACE_PROTOCOL: &str = "workspace:";

/// Prefix of an npm override that points at a direct dependency (`"$react"`)
const OVERRIDE_REFERENCE_PREFIX: char = '$';

/// Whether `spec` points elsewhere instead of declaring a version
///
/// Catalog references, `workspace:` links and `$name` override references are never
/// resolved as current versions and never rewritten.
pub fn is_indirect_spec(spec: &str) -> bool {
    let spec = spec.trim();
    is_catalog_reference(spec)
        || spec.starts_with(WORKSPACE_PROTOCOL)
        || spec.starts_with(OVERRIDE_REFERENCE_PREFIX)
}

/// Resolves duplicate declarations within one manifest
#[derive(Debug, Clone)]
pub struct SectionResolver {
    sections: Vec<DeclarationSection>,
    workspace_packages: HashSet<String>,
    filter: PackageFilter,
}

impl SectionResolver {
    pub fn new(
        sections: &[DeclarationSection],
        workspace_packages: HashSet<String>,
        filter: PackageFilter,
    ) -> Self {
        Self {
            sections: DeclarationSection::with_overrides(sections),
            workspace_packages,
            filter,
        }
    }

    /// Build a resolver from configuration; a malformed filter is reported here
    ///
    /// `workspace_packages` is unioned with the names listed in `config`.
    pub fn from_config(
        config: &UpgradeConfig,
        mut workspace_packages: HashSet<String>,
    ) -> Result<Self, ConfigError> {
        let filter = PackageFilter::from_config(config)?;
        workspace_packages.extend(config.workspace_packages.iter().cloned());
        Ok(Self::new(&config.sections, workspace_packages, filter))
    }

    /// Add names owned by the workspace
    pub fn with_workspace_packages(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.workspace_packages.extend(names);
        self
    }

    /// Sections scanned, override family last
    pub fn sections(&self) -> &[DeclarationSection] {
        &self.sections
    }

    pub fn workspace_packages(&self) -> &HashSet<String> {
        &self.workspace_packages
    }

    pub fn filter(&self) -> &PackageFilter {
        &self.filter
    }

    /// Dependency name -> effective current spec
    pub fn resolve(&self, manifest: &Manifest) -> IndexMap<String, String> {
        let mut resolved: IndexMap<String, String> = IndexMap::new();

        for (section, name, spec) in manifest.declarations(&self.sections) {
            if is_indirect_spec(spec) {
                continue;
            }
            if self.workspace_packages.contains(name) {
                continue;
            }

            match resolved.get_mut(name) {
                None => {
                    resolved.insert(name.to_string(), spec.to_string());
                }
                Some(existing) if is_strictly_lower(spec, existing.as_str()) => {
                    debug!(
                        "{}: {} in {} is lower than {}, using it",
                        manifest.identity, name, section, existing
                    );
                    *existing = spec.to_string();
                }
                Some(_) => {}
            }
        }

        resolved.retain(|name, spec| {
            self.filter.matches(name) && self.filter.matches_version(spec)
        });
        resolved
    }
}

/// Resolve a manifest against `sections` in one call
pub fn resolve_sections(
    manifest: &Manifest,
    sections: &[DeclarationSection],
    workspace_packages: &HashSet<String>,
    filter: &PackageFilter,
) -> IndexMap<String, String> {
    SectionResolver::new(sections, workspace_packages.clone(), filter.clone()).resolve(manifest)
}
