//! Structural paths at which a catalog can live
//!
//! | Format | Roots | Default catalog | Named catalog |
//! |---|---|---|---|
//! | workspace YAML | document root | `catalog`, `catalogs.default` | `catalogs.<name>` |
//! | package.json | document root, `workspaces` | same, under each root | same, under each root |

use crate::catalog::reference::DEFAULT_CATALOG_NAME;
use crate::parser::traits::Document;
use crate::parser::types::FileFormat;

const WORKSPACE_FILE_ROOTS: &[&[&str]] = &[&[]];
const MANIFEST_ROOTS: &[&[&str]] = &[&[], &["workspaces"]];

/// Paths under which `catalog`/`catalogs` may appear
pub fn catalog_roots(format: FileFormat) -> &'static [&'static [&'static str]] {
    match format {
        FileFormat::BlockStructured => WORKSPACE_FILE_ROOTS,
        FileFormat::Delimited => MANIFEST_ROOTS,
    }
}

/// Candidate paths of the mapping holding `catalog` (`""` is the default catalog)
///
/// For the default catalog the flat `catalog` node comes before `catalogs.default`.
pub fn catalog_paths(format: FileFormat, catalog: &str) -> Vec<Vec<&str>> {
    let mut paths = Vec::new();
    for root in catalog_roots(format) {
        if catalog.is_empty() {
            paths.push([*root, &["catalog"][..]].concat());
            paths.push([*root, &["catalogs", DEFAULT_CATALOG_NAME][..]].concat());
        } else {
            paths.push([*root, &["catalogs", catalog][..]].concat());
        }
    }
    paths
}

/// Candidate paths of `dependency` inside `catalog`
pub fn entry_paths<'a>(
    format: FileFormat,
    catalog: &'a str,
    dependency: &'a str,
) -> Vec<Vec<&'a str>> {
    catalog_paths(format, catalog)
        .into_iter()
        .map(|mut path| {
            path.push(dependency);
            path
        })
        .collect()
}

/// Names of the catalogs a document defines, default first
pub fn defined_catalogs(document: &dyn Document) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };

    for root in catalog_roots(document.format()) {
        let flat = [*root, &["catalog"][..]].concat();
        if !document.entries(&flat).is_empty() {
            push("");
        }
        let named = [*root, &["catalogs"][..]].concat();
        for name in document.keys(&named) {
            push(if name == DEFAULT_CATALOG_NAME { "" } else { &name });
        }
    }

    names
}
