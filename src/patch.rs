//! Format-preserving patcher
//!
//! Applies every edit destined for one file against a single parse of its text and
//! serializes once. Only the located value leaves change; comments, key order,
//! indentation and quoting style survive byte for byte.

use std::fmt;

use tracing::debug;

use crate::catalog::paths::entry_paths;
use crate::catalog::reference::is_catalog_reference;
use crate::manifest::package_json::FileIdentity;
use crate::manifest::resolver::is_indirect_spec;
use crate::manifest::section::DeclarationSection;
use crate::parser::traits::{Document, ParseError, open_document};
use crate::parser::types::FileFormat;
use crate::version::range::RangeSpec;

/// One planned rewrite of a dependency spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOperation {
    pub target: FileIdentity,
    pub dependency: String,
    /// Catalog holding the definition; None for a direct manifest declaration
    pub catalog: Option<String>,
    /// Sections searched for a direct declaration
    pub sections: Vec<DeclarationSection>,
    pub old: String,
    pub new: String,
}

impl EditOperation {
    /// Edit of a direct declaration in a manifest
    pub fn manifest(
        target: FileIdentity,
        dependency: impl Into<String>,
        sections: &[DeclarationSection],
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        Self {
            target,
            dependency: dependency.into(),
            catalog: None,
            sections: sections.to_vec(),
            old: old.into(),
            new: new.into(),
        }
    }

    /// Edit of a catalog definition (`catalog` is `""` for the default catalog)
    pub fn catalog(
        target: FileIdentity,
        dependency: impl Into<String>,
        catalog: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        Self {
            target,
            dependency: dependency.into(),
            catalog: Some(catalog.into()),
            sections: Vec::new(),
            old: old.into(),
            new: new.into(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.old == self.new
    }

    /// (file, dependency, catalog) triple identifying the logical location
    pub fn location(&self) -> (&FileIdentity, &str, Option<&str>) {
        (&self.target, &self.dependency, self.catalog.as_deref())
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} -> {}",
            self.target, self.dependency, self.old, self.new
        )
    }
}

/// Result of patching one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Patched text (identical to the input when nothing changed)
    pub content: String,
    /// Operations that rewrote at least one leaf
    pub applied: usize,
    /// Operations whose target path does not exist in the document
    pub skipped: usize,
    /// Operations that were found but already held the new value
    pub unchanged: usize,
}

impl PatchOutcome {
    pub fn is_changed(&self) -> bool {
        self.applied > 0
    }
}

/// Apply `operations` to `content`, parsed as `format`
pub fn apply_edits(
    content: &str,
    format: FileFormat,
    operations: &[EditOperation],
) -> Result<PatchOutcome, ParseError> {
    let mut document = open_document(format, content)?;
    let mut outcome = PatchOutcome {
        content: String::new(),
        applied: 0,
        skipped: 0,
        unchanged: 0,
    };

    for operation in operations {
        match apply_operation(document.as_mut(), operation) {
            EditResult::Applied => outcome.applied += 1,
            EditResult::Unchanged => outcome.unchanged += 1,
            EditResult::PathAbsent => {
                debug!("Skipping {}: no declaration found", operation);
                outcome.skipped += 1;
            }
        }
    }

    outcome.content = document.serialize();
    Ok(outcome)
}

enum EditResult {
    Applied,
    Unchanged,
    PathAbsent,
}

fn apply_operation(document: &mut dyn Document, operation: &EditOperation) -> EditResult {
    // (leaf, text to write, spec currently declared)
    let targets: Vec<_> = match &operation.catalog {
        Some(catalog) => entry_paths(document.format(), catalog, &operation.dependency)
            .iter()
            .flat_map(|path| document.locate(path))
            .map(|leaf| {
                let spec = leaf.value.clone();
                (leaf, operation.new.clone(), spec)
            })
            .collect(),
        None => operation
            .sections
            .iter()
            .flat_map(|section| {
                section
                    .locate(&*document, &operation.dependency)
                    .into_iter()
                    .map(move |found| {
                        let text = section.encode(&operation.dependency, &operation.new);
                        (found.leaf, text, found.spec)
                    })
            })
            .collect(),
    };

    if targets.is_empty() {
        return EditResult::PathAbsent;
    }
    if operation.is_noop() {
        return EditResult::Unchanged;
    }

    let mut applied = false;
    for (leaf, text, spec) in targets {
        if spec == operation.new {
            continue;
        }
        // A direct edit only replaces the declaration it was computed from
        let foreign = match operation.catalog {
            Some(_) => is_catalog_reference(&spec),
            None => {
                spec != operation.old
                    || is_indirect_spec(&spec)
                    || RangeSpec::parse(&spec).is_none()
            }
        };
        if foreign {
            debug!("Keeping {} = {} in {}", operation.dependency, spec, operation.target);
            continue;
        }
        applied |= document.replace_leaf(&leaf, &text);
    }

    if applied {
        EditResult::Applied
    } else {
        EditResult::Unchanged
    }
}
