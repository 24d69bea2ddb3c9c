//! Manifest loading

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::manifest::section::DeclarationSection;
use crate::parser::traits::{Document, ParseError, open_document};
use crate::parser::types::FileFormat;

/// Identity of an edit target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileIdentity {
    /// A whole file
    File(PathBuf),
    /// One catalog inside a definition file (`""` is the default catalog)
    CatalogSlice { file: PathBuf, catalog: String },
}

impl FileIdentity {
    /// Physical file behind this identity
    pub fn file(&self) -> &Path {
        match self {
            FileIdentity::File(path) => path,
            FileIdentity::CatalogSlice { file, .. } => file,
        }
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileIdentity::File(path) => write!(f, "{}", path.display()),
            FileIdentity::CatalogSlice { file, catalog } if catalog.is_empty() => {
                write!(f, "{} (catalog)", file.display())
            }
            FileIdentity::CatalogSlice { file, catalog } => {
                write!(f, "{} (catalog:{})", file.display(), catalog)
            }
        }
    }
}

/// A dependency-declaring file, read once per run
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Package name, when the manifest declares one
    pub name: Option<String>,
    pub identity: FileIdentity,
    pub format: FileFormat,
    /// Original text, needed for format-preserving edits
    pub content: String,
    /// Declarations per section, in source order
    pub sections: IndexMap<DeclarationSection, IndexMap<String, String>>,
}

impl Manifest {
    /// Parse a manifest and read every known section
    pub fn parse(
        identity: FileIdentity,
        format: FileFormat,
        content: &str,
    ) -> Result<Self, ParseError> {
        let document = open_document(format, content)?;
        Ok(Self::from_document(identity, document.as_ref()))
    }

    pub fn from_document(identity: FileIdentity, document: &dyn Document) -> Self {
        let name = document
            .locate(&["name"])
            .into_iter()
            .next()
            .map(|leaf| leaf.value)
            .filter(|name| !name.is_empty());

        let sections = DeclarationSection::ALL
            .into_iter()
            .filter_map(|section| {
                let entries: IndexMap<String, String> =
                    section.read(document).into_iter().collect();
                (!entries.is_empty()).then_some((section, entries))
            })
            .collect();

        Self {
            name,
            identity,
            format: document.format(),
            content: document.content().to_string(),
            sections,
        }
    }

    pub fn section(&self, section: DeclarationSection) -> Option<&IndexMap<String, String>> {
        self.sections.get(&section)
    }

    /// Declarations of `sections`, in the given section order
    pub fn declarations<'a>(
        &'a self,
        sections: &'a [DeclarationSection],
    ) -> impl Iterator<Item = (DeclarationSection, &'a str, &'a str)> + 'a {
        sections.iter().flat_map(move |section| {
            self.section(*section)
                .into_iter()
                .flat_map(move |entries| {
                    entries
                        .iter()
                        .map(move |(name, spec)| (*section, name.as_str(), spec.as_str()))
                })
        })
    }
}
