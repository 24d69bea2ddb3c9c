//! Declaration sections of a package manifest

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::parser::traits::Document;
use crate::parser::types::Leaf;

/// Location within a manifest where name -> spec pairs live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum DeclarationSection {
    Dependencies,
    DevDependencies,
    PeerDependencies,
    OptionalDependencies,
    /// npm `overrides`
    Overrides,
    /// pnpm `pnpm.overrides`
    PnpmOverrides,
    /// yarn `resolutions`
    Resolutions,
    /// Single-entry section decoded from `packageManager: "<name>@<version>"`
    PackageManager,
}

/// A section entry found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLeaf {
    /// Spec the entry currently declares
    pub spec: String,
    /// Leaf that holds the spec in the document text
    pub leaf: Leaf,
}

impl DeclarationSection {
    pub const ALL: [DeclarationSection; 8] = [
        DeclarationSection::Dependencies,
        DeclarationSection::DevDependencies,
        DeclarationSection::PeerDependencies,
        DeclarationSection::OptionalDependencies,
        DeclarationSection::Overrides,
        DeclarationSection::PnpmOverrides,
        DeclarationSection::Resolutions,
        DeclarationSection::PackageManager,
    ];

    /// Sections that pin versions for the whole dependency graph
    pub const OVERRIDES: [DeclarationSection; 2] = [
        DeclarationSection::Overrides,
        DeclarationSection::PnpmOverrides,
    ];

    /// Configuration name of the section
    pub fn key(&self) -> &'static str {
        match self {
            DeclarationSection::Dependencies => "dependencies",
            DeclarationSection::DevDependencies => "devDependencies",
            DeclarationSection::PeerDependencies => "peerDependencies",
            DeclarationSection::OptionalDependencies => "optionalDependencies",
            DeclarationSection::Overrides => "overrides",
            DeclarationSection::PnpmOverrides => "pnpm.overrides",
            DeclarationSection::Resolutions => "resolutions",
            DeclarationSection::PackageManager => "packageManager",
        }
    }

    /// Key path of the section from the document root
    pub fn path(&self) -> &'static [&'static str] {
        match self {
            DeclarationSection::Dependencies => &["dependencies"],
            DeclarationSection::DevDependencies => &["devDependencies"],
            DeclarationSection::PeerDependencies => &["peerDependencies"],
            DeclarationSection::OptionalDependencies => &["optionalDependencies"],
            DeclarationSection::Overrides => &["overrides"],
            DeclarationSection::PnpmOverrides => &["pnpm", "overrides"],
            DeclarationSection::Resolutions => &["resolutions"],
            DeclarationSection::PackageManager => &["packageManager"],
        }
    }

    /// `sections` followed by the override family, without duplicates
    pub fn with_overrides(sections: &[DeclarationSection]) -> Vec<DeclarationSection> {
        let mut result: Vec<DeclarationSection> = Vec::new();
        for section in sections.iter().chain(DeclarationSection::OVERRIDES.iter()) {
            if !result.contains(section) {
                result.push(*section);
            }
        }
        result
    }

    /// Every (name, spec) pair declared in this section, in source order
    pub fn read(&self, document: &dyn Document) -> Vec<(String, String)> {
        match self {
            DeclarationSection::PackageManager => document
                .locate(self.path())
                .into_iter()
                .filter_map(|leaf| decode_package_manager(&leaf.value))
                .collect(),
            _ => document
                .entries(self.path())
                .into_iter()
                .map(|(name, leaf)| (name, leaf.value))
                .collect(),
        }
    }

    /// Leaves declaring `name` in this section
    pub fn locate(&self, document: &dyn Document, name: &str) -> Vec<SectionLeaf> {
        match self {
            DeclarationSection::PackageManager => document
                .locate(self.path())
                .into_iter()
                .filter_map(|leaf| {
                    let (pinned, version) = decode_package_manager(&leaf.value)?;
                    (pinned == name).then_some(SectionLeaf {
                        spec: version,
                        leaf,
                    })
                })
                .collect(),
            _ => {
                let mut path = self.path().to_vec();
                path.push(name);
                document
                    .locate(&path)
                    .into_iter()
                    .map(|leaf| SectionLeaf {
                        spec: leaf.value.clone(),
                        leaf,
                    })
                    .collect()
            }
        }
    }

    /// Text to write into a leaf of this section for `name` at `spec`
    pub fn encode(&self, name: &str, spec: &str) -> String {
        match self {
            DeclarationSection::PackageManager => format!("{name}@{spec}"),
            _ => spec.to_string(),
        }
    }
}

/// Split `"pnpm@9.1.0+sha512.abc"` into `("pnpm", "9.1.0")`
pub fn decode_package_manager(value: &str) -> Option<(String, String)> {
    let at = value.rfind('@').filter(|&at| at > 0)?;
    let (name, rest) = (&value[..at], &value[at + 1..]);
    let version = rest.split('+').next().unwrap_or(rest).trim();
    if version.is_empty() {
        return None;
    }
    Some((name.to_string(), version.to_string()))
}

impl fmt::Display for DeclarationSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DeclarationSection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeclarationSection::ALL
            .into_iter()
            .find(|section| section.key() == s)
            .ok_or_else(|| ConfigError::InvalidSection(s.to_string()))
    }
}

impl TryFrom<String> for DeclarationSection {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
