//! Catalog references and their collection across consumer manifests

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::manifest::package_json::Manifest;
use crate::manifest::section::DeclarationSection;

/// Protocol marking an indirect declaration
pub const CATALOG_PROTOCOL: &str = "catalog:";

/// Name under which the implicit catalog may also be addressed
pub const DEFAULT_CATALOG_NAME: &str = "default";

/// Dependency name -> catalog name, as written by a consumer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogReference {
    pub dependency: String,
    /// Empty for the default catalog
    pub catalog: String,
}

impl CatalogReference {
    /// Decompose `spec` if it points at a catalog
    ///
    /// `catalog:` and `catalog:default` both address the default catalog.
    pub fn parse(dependency: &str, spec: &str) -> Option<Self> {
        let name = spec.trim().strip_prefix(CATALOG_PROTOCOL)?.trim();
        Some(Self {
            dependency: dependency.to_string(),
            catalog: normalize_catalog_name(name).to_string(),
        })
    }
}

/// Whether `spec` is a catalog reference
pub fn is_catalog_reference(spec: &str) -> bool {
    spec.trim().starts_with(CATALOG_PROTOCOL)
}

/// Map the `default` alias onto the empty name
pub fn normalize_catalog_name(name: &str) -> &str {
    if name == DEFAULT_CATALOG_NAME { "" } else { name }
}

/// Catalog name -> dependency names referenced by at least one consumer
pub fn collect_catalog_references(
    manifests: &[Manifest],
    sections: &[DeclarationSection],
    workspace_packages: &HashSet<String>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for manifest in manifests {
        for (_, name, spec) in manifest.declarations(sections) {
            if workspace_packages.contains(name) {
                continue;
            }
            if let Some(reference) = CatalogReference::parse(name, spec) {
                references
                    .entry(reference.catalog)
                    .or_default()
                    .insert(reference.dependency);
            }
        }
    }

    references
}
