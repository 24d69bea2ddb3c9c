use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Already discovered files of one workspace
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceLayout {
    /// Root package.json; a consumer and possibly a catalog definition file
    pub root_manifest: Option<PathBuf>,
    /// pnpm-workspace.yaml
    pub workspace_file: Option<PathBuf>,
    /// Member package.json files
    pub members: Vec<PathBuf>,
}

/// Role a file plays in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// Declares dependencies only
    Consumer,
    /// Defines catalogs only
    CatalogSource,
    /// Root manifest: declares dependencies and may define catalogs
    Root,
}

impl FileRole {
    pub fn is_consumer(&self) -> bool {
        matches!(self, FileRole::Consumer | FileRole::Root)
    }

    pub fn is_catalog_source(&self) -> bool {
        matches!(self, FileRole::CatalogSource | FileRole::Root)
    }
}

impl WorkspaceLayout {
    /// Every file once, catalog sources in merge order (workspace file before root manifest)
    pub fn files(&self) -> Vec<(PathBuf, FileRole)> {
        let mut files: Vec<(PathBuf, FileRole)> = Vec::new();
        let mut push = |path: &Path, role: FileRole| {
            if !files.iter().any(|(known, _)| known == path) {
                files.push((path.to_path_buf(), role));
            }
        };

        if let Some(path) = &self.workspace_file {
            push(path, FileRole::CatalogSource);
        }
        if let Some(path) = &self.root_manifest {
            push(path, FileRole::Root);
        }
        for path in &self.members {
            push(path, FileRole::Consumer);
        }
        files
    }
}
