//! Catalog definitions merged across definition files
//!
//! A workspace may define catalogs in `pnpm-workspace.yaml`, in the root `package.json`
//! (at the root or under `workspaces`), or both. Definitions are merged key by key in
//! load order, so a later file wins for the same catalog and dependency. Every file that
//! defines an entry is remembered so that an edit reaches all of them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::catalog::paths::{catalog_paths, defined_catalogs};
use crate::parser::traits::{Document, ParseError, open_document};
use crate::parser::types::FileFormat;
use crate::version::semver::is_strictly_lower;

/// A catalog entry and the files defining it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Current spec, last writer wins
    pub spec: String,
    /// Defining files, in load order
    pub files: Vec<PathBuf>,
}

/// Catalog name -> dependency -> entry
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    catalogs: BTreeMap<String, IndexMap<String, CatalogEntry>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `content` and merge its catalogs into the store
    ///
    /// A document without catalog sections adds nothing. Invalid markup is an error and
    /// leaves the store untouched.
    pub fn load(
        &mut self,
        path: &Path,
        format: FileFormat,
        content: &str,
    ) -> Result<(), ParseError> {
        let document = open_document(format, content)?;
        self.add_document(path, document.as_ref());
        Ok(())
    }

    /// Merge the catalogs of an already parsed document
    pub fn add_document(&mut self, path: &Path, document: &dyn Document) {
        for catalog in defined_catalogs(document) {
            let mut count = 0;
            for mapping in catalog_paths(document.format(), &catalog) {
                for (dependency, leaf) in document.entries(&mapping) {
                    self.insert(&catalog, &dependency, leaf.value, path);
                    count += 1;
                }
            }
            debug!(
                "Loaded {} entries for catalog '{}' from {}",
                count,
                catalog,
                path.display()
            );
        }
    }

    fn insert(&mut self, catalog: &str, dependency: &str, spec: String, path: &Path) {
        let entries = self.catalogs.entry(catalog.to_string()).or_default();
        match entries.get_mut(dependency) {
            Some(entry) => {
                entry.spec = spec;
                if !entry.files.iter().any(|f| f == path) {
                    entry.files.push(path.to_path_buf());
                }
            }
            None => {
                entries.insert(
                    dependency.to_string(),
                    CatalogEntry {
                        spec,
                        files: vec![path.to_path_buf()],
                    },
                );
            }
        }
    }

    /// Current spec of `dependency` in `catalog`
    pub fn get(&self, catalog: &str, dependency: &str) -> Option<&str> {
        self.entry(catalog, dependency).map(|entry| entry.spec.as_str())
    }

    pub fn entry(&self, catalog: &str, dependency: &str) -> Option<&CatalogEntry> {
        self.catalogs.get(catalog)?.get(dependency)
    }

    /// Files defining `dependency` in `catalog`
    pub fn definitions(&self, catalog: &str, dependency: &str) -> &[PathBuf] {
        self.entry(catalog, dependency)
            .map(|entry| entry.files.as_slice())
            .unwrap_or_default()
    }

    /// Names of every defined catalog, default (`""`) first
    pub fn catalog_names(&self) -> impl Iterator<Item = &str> {
        self.catalogs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.values().all(IndexMap::is_empty)
    }

    /// Catalogs that are defined here and referenced by at least one consumer
    pub fn active_catalogs(
        &self,
        references: &BTreeMap<String, BTreeSet<String>>,
    ) -> BTreeSet<String> {
        references
            .iter()
            .filter(|(name, dependencies)| {
                !dependencies.is_empty()
                    && self
                        .catalogs
                        .get(name.as_str())
                        .is_some_and(|entries| !entries.is_empty())
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Single dependency -> spec view over all catalogs
    ///
    /// The default catalog is read first; a later catalog only replaces a spec it is
    /// strictly lower than.
    pub fn flatten(&self) -> IndexMap<String, String> {
        let mut flat: IndexMap<String, String> = IndexMap::new();
        for entries in self.catalogs.values() {
            for (dependency, entry) in entries {
                match flat.get_mut(dependency) {
                    None => {
                        flat.insert(dependency.clone(), entry.spec.clone());
                    }
                    Some(existing) if is_strictly_lower(&entry.spec, existing.as_str()) => {
                        *existing = entry.spec.clone();
                    }
                    Some(_) => {}
                }
            }
        }
        flat
    }
}
