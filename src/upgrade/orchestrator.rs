//! Upgrade orchestrator for coordinating one run
//!
//! Workflow: collect manifests → resolve current versions → resolve catalog references
//! → obtain desired versions → compute edits → group by file → apply and persist.
//!
//! Every file is read at most once and written at most once. A file that fails to read,
//! parse or patch only loses its own edits; a configuration error aborts the run before
//! any file is read.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::catalog::reference::collect_catalog_references;
use crate::catalog::store::CatalogStore;
use crate::config::UpgradeConfig;
use crate::manifest::package_json::{FileIdentity, Manifest};
use crate::manifest::resolver::SectionResolver;
use crate::parser::types::{FileFormat, detect_format};
use crate::patch::{EditOperation, apply_edits};
use crate::upgrade::error::UpgradeError;
use crate::upgrade::layout::WorkspaceLayout;
use crate::upgrade::report::{FileOutcome, FileStatus, UpgradeReport};
use crate::upgrade::store::FileStore;
use crate::version::range::RangeSpec;
use crate::version::semver::apply_range_prefix;
use crate::version::source::VersionSource;

/// Steps of a run, used to label log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradePhase {
    CollectManifests,
    ResolveCurrentVersions,
    ResolveCatalogReferences,
    ObtainDesiredVersions,
    ComputeEdits,
    GroupEditsByTargetFile,
    ApplyAndPersist,
    Completed,
}

impl fmt::Display for UpgradePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpgradePhase::CollectManifests => "collect-manifests",
            UpgradePhase::ResolveCurrentVersions => "resolve-current-versions",
            UpgradePhase::ResolveCatalogReferences => "resolve-catalog-references",
            UpgradePhase::ObtainDesiredVersions => "obtain-desired-versions",
            UpgradePhase::ComputeEdits => "compute-edits",
            UpgradePhase::GroupEditsByTargetFile => "group-edits",
            UpgradePhase::ApplyAndPersist => "apply-and-persist",
            UpgradePhase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// A file read during collection
struct LoadedFile {
    format: FileFormat,
    content: String,
}

/// A catalog entry referenced by at least one consumer
struct CatalogTarget {
    catalog: String,
    dependency: String,
    current: String,
}

/// State gathered before any edit is computed
#[derive(Default)]
struct Collected {
    files: IndexMap<PathBuf, LoadedFile>,
    failures: IndexMap<PathBuf, UpgradeError>,
    manifests: Vec<Manifest>,
    catalogs: CatalogStore,
}

/// Orchestrator for one upgrade run
pub struct UpgradeOrchestrator<F: FileStore, V: VersionSource> {
    files: F,
    versions: V,
    config: UpgradeConfig,
}

impl<F: FileStore, V: VersionSource> UpgradeOrchestrator<F, V> {
    pub fn new(files: F, versions: V, config: UpgradeConfig) -> Self {
        Self {
            files,
            versions,
            config,
        }
    }

    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    /// Run the upgrade workflow over `layout`
    ///
    /// Only a configuration error is returned as `Err`; every per-file failure is
    /// recorded in the report.
    pub async fn run(&self, layout: &WorkspaceLayout) -> Result<UpgradeReport, UpgradeError> {
        let resolver = SectionResolver::from_config(&self.config, HashSet::new())?;

        info!("[{}] {} files", UpgradePhase::CollectManifests, layout.files().len());
        let mut collected = self.collect(layout).await;

        let resolver = resolver
            .with_workspace_packages(collected.manifests.iter().filter_map(|m| m.name.clone()));

        info!("[{}]", UpgradePhase::ResolveCurrentVersions);
        let current: Vec<(FileIdentity, IndexMap<String, String>)> = collected
            .manifests
            .iter()
            .map(|manifest| (manifest.identity.clone(), resolver.resolve(manifest)))
            .collect();

        let catalog_targets = self.resolve_catalog_targets(&collected, &resolver);
        info!(
            "[{}] {} catalog entries referenced",
            UpgradePhase::ResolveCatalogReferences,
            catalog_targets.len()
        );

        let names: BTreeSet<&str> = current
            .iter()
            .flat_map(|(_, resolved)| resolved.keys().map(String::as_str))
            .chain(catalog_targets.iter().map(|t| t.dependency.as_str()))
            .collect();
        let desired = self.obtain_desired_versions(names).await;

        let edits = self.compute_edits(&current, &catalog_targets, &collected, &resolver, &desired);
        info!("[{}] {} edits", UpgradePhase::ComputeEdits, edits.len());

        let groups = group_by_file(&edits);
        debug!("[{}] {} target files", UpgradePhase::GroupEditsByTargetFile, groups.len());

        let mut report = UpgradeReport {
            files: Vec::new(),
            edits: Vec::new(),
            dry_run: self.config.dry_run,
        };
        self.apply_and_persist(&mut collected, groups, &mut report).await;
        report.edits = edits;

        info!(
            "[{}] {} patched, {} failed",
            UpgradePhase::Completed,
            report.patched().count(),
            report.failures().count()
        );
        Ok(report)
    }

    /// Read and parse every file of the layout once
    async fn collect(&self, layout: &WorkspaceLayout) -> Collected {
        let mut collected = Collected::default();

        for (path, role) in layout.files() {
            let Some(format) = detect_format(&path) else {
                error!("Unsupported file format: {}", path.display());
                collected
                    .failures
                    .insert(path.clone(), UpgradeError::unsupported_format(path));
                continue;
            };

            let content = match self.files.read(&path).await {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read {}: {}", path.display(), e);
                    collected
                        .failures
                        .insert(path.clone(), UpgradeError::read(path, e));
                    continue;
                }
            };

            if role.is_catalog_source()
                && let Err(e) = collected.catalogs.load(&path, format, &content)
            {
                error!("Failed to parse {}: {}", path.display(), e);
                collected
                    .failures
                    .insert(path.clone(), UpgradeError::parse(path, e));
                continue;
            }

            if role.is_consumer() {
                match Manifest::parse(FileIdentity::File(path.clone()), format, &content) {
                    Ok(manifest) => collected.manifests.push(manifest),
                    Err(e) => {
                        error!("Failed to parse {}: {}", path.display(), e);
                        collected
                            .failures
                            .insert(path.clone(), UpgradeError::parse(path, e));
                        continue;
                    }
                }
            }

            collected.files.insert(path, LoadedFile { format, content });
        }

        let catalogs: Vec<&str> = collected.catalogs.catalog_names().map(display_catalog).collect();
        debug!("Catalogs defined: [{}]", catalogs.join(", "));
        collected
    }

    /// Catalog entries that at least one consumer references
    fn resolve_catalog_targets(
        &self,
        collected: &Collected,
        resolver: &SectionResolver,
    ) -> Vec<CatalogTarget> {
        let references = collect_catalog_references(
            &collected.manifests,
            resolver.sections(),
            resolver.workspace_packages(),
        );
        let active = collected.catalogs.active_catalogs(&references);

        let mut targets = Vec::new();
        for (catalog, dependencies) in &references {
            if !active.contains(catalog) {
                if !dependencies.is_empty() {
                    warn!(
                        "Catalog '{}' is referenced but not defined",
                        display_catalog(catalog)
                    );
                }
                continue;
            }
            for dependency in dependencies {
                if !resolver.filter().matches(dependency) {
                    continue;
                }
                match collected.catalogs.get(catalog, dependency) {
                    Some(current) if !resolver.filter().matches_version(current) => {
                        debug!("{} = {} is filtered out", dependency, current)
                    }
                    Some(current) => targets.push(CatalogTarget {
                        catalog: catalog.clone(),
                        dependency: dependency.clone(),
                        current: current.to_string(),
                    }),
                    None => warn!(
                        "{} is not defined in catalog '{}'",
                        dependency,
                        display_catalog(catalog)
                    ),
                }
            }
        }
        targets
    }

    /// Ask the version source for every name, `concurrency` lookups at a time
    ///
    /// A failed lookup only drops its own name.
    async fn obtain_desired_versions(&self, names: BTreeSet<&str>) -> HashMap<String, String> {
        info!(
            "[{}] {} names",
            UpgradePhase::ObtainDesiredVersions,
            names.len()
        );

        let results: Vec<(&str, _)> = stream::iter(names)
            .map(|name| async move { (name, self.versions.desired_version(name).await) })
            .buffer_unordered(self.config.lookup_concurrency())
            .collect()
            .await;

        let mut desired = HashMap::new();
        for (name, result) in results {
            match result {
                Ok(Some(spec)) => {
                    desired.insert(name.to_string(), spec);
                }
                Ok(None) => debug!("No upgrade available for {}", name),
                Err(e) => warn!("Lookup failed for {}: {}", name, e),
            }
        }
        desired
    }

    fn new_spec(&self, current: &str, desired: &str) -> String {
        if self.config.keep_range_prefix {
            apply_range_prefix(current, desired)
        } else {
            desired.to_string()
        }
    }

    fn compute_edits(
        &self,
        current: &[(FileIdentity, IndexMap<String, String>)],
        catalog_targets: &[CatalogTarget],
        collected: &Collected,
        resolver: &SectionResolver,
        desired: &HashMap<String, String>,
    ) -> Vec<EditOperation> {
        let mut edits = EditPlan::default();

        for (identity, resolved) in current {
            for (dependency, old) in resolved {
                let Some(target) = desired.get(dependency) else {
                    continue;
                };
                if !is_version_range(dependency, old) {
                    continue;
                }
                let new = self.new_spec(old, target);
                if new == *old {
                    continue;
                }
                edits.push(EditOperation::manifest(
                    identity.clone(),
                    dependency.as_str(),
                    resolver.sections(),
                    old.as_str(),
                    new,
                ));
            }
        }

        for target in catalog_targets {
            let Some(desired) = desired.get(&target.dependency) else {
                continue;
            };
            if !is_version_range(&target.dependency, &target.current) {
                continue;
            }
            let new = self.new_spec(&target.current, desired);
            if new == target.current {
                continue;
            }
            for file in collected
                .catalogs
                .definitions(&target.catalog, &target.dependency)
            {
                edits.push(EditOperation::catalog(
                    FileIdentity::CatalogSlice {
                        file: file.clone(),
                        catalog: target.catalog.clone(),
                    },
                    target.dependency.as_str(),
                    target.catalog.as_str(),
                    target.current.as_str(),
                    new.as_str(),
                ));
            }
        }

        edits.operations
    }

    /// Patch each file against its single in-memory copy and flush once
    async fn apply_and_persist(
        &self,
        collected: &mut Collected,
        mut groups: IndexMap<PathBuf, Vec<EditOperation>>,
        report: &mut UpgradeReport,
    ) {
        info!("[{}]", UpgradePhase::ApplyAndPersist);

        for (path, error) in collected.failures.drain(..) {
            if groups.swap_remove(&path).is_some() {
                warn!("Dropping edits for {}: file failed earlier", path.display());
            }
            report.files.push(FileOutcome::failed(path, error));
        }

        for (path, file) in &collected.files {
            let Some(operations) = groups.swap_remove(path) else {
                report.files.push(FileOutcome::unchanged(path.clone()));
                continue;
            };
            report
                .files
                .push(self.patch_file(path, file, &operations).await);
        }

        // Edits for files that were never collected cannot be applied
        for (path, operations) in groups {
            warn!(
                "Dropping {} edits for {}: file was not loaded",
                operations.len(),
                path.display()
            );
        }
    }

    async fn patch_file(
        &self,
        path: &Path,
        file: &LoadedFile,
        operations: &[EditOperation],
    ) -> FileOutcome {
        let outcome = match apply_edits(&file.content, file.format, operations) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to patch {}: {}", path.display(), e);
                return FileOutcome::failed(path.to_path_buf(), UpgradeError::parse(path, e));
            }
        };

        if !outcome.is_changed() || outcome.content == file.content {
            debug!("{} unchanged", path.display());
            return FileOutcome::unchanged(path.to_path_buf());
        }

        if self.config.dry_run {
            info!("Dry run: not writing {}", path.display());
        } else if let Err(e) = self.files.write(path, &outcome.content).await {
            error!("Failed to write {}: {}", path.display(), e);
            return FileOutcome::failed(path.to_path_buf(), UpgradeError::write(path, e));
        } else {
            info!(
                "Patched {} ({} applied, {} skipped)",
                path.display(),
                outcome.applied,
                outcome.skipped
            );
        }

        FileOutcome {
            path: path.to_path_buf(),
            status: FileStatus::Patched {
                applied: outcome.applied,
                skipped: outcome.skipped,
            },
            content: Some(outcome.content),
        }
    }
}

/// Edits with unique (file, dependency, catalog) locations
#[derive(Default)]
struct EditPlan {
    operations: Vec<EditOperation>,
}

impl EditPlan {
    /// Add an edit; a conflicting edit for an already planned location is dropped
    fn push(&mut self, operation: EditOperation) {
        if let Some(existing) = self
            .operations
            .iter()
            .find(|planned| planned.location() == operation.location())
        {
            if existing.new != operation.new {
                warn!(
                    "Conflicting edit for {} ({} vs {}), keeping the first",
                    operation.dependency, existing.new, operation.new
                );
            }
            return;
        }
        self.operations.push(operation);
    }
}

fn group_by_file(edits: &[EditOperation]) -> IndexMap<PathBuf, Vec<EditOperation>> {
    let mut groups: IndexMap<PathBuf, Vec<EditOperation>> = IndexMap::new();
    for edit in edits {
        groups
            .entry(edit.target.file().to_path_buf())
            .or_default()
            .push(edit.clone());
    }
    groups
}

/// Only registry ranges are upgraded; git, URL, alias and tag specs are kept
fn is_version_range(dependency: &str, spec: &str) -> bool {
    let is_range = RangeSpec::parse(spec).is_some();
    if !is_range {
        debug!("Keeping {} = {}: not a version range", dependency, spec);
    }
    is_range
}

fn display_catalog(catalog: &str) -> &str {
    if catalog.is_empty() { "default" } else { catalog }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::store::MockFileStore;
    use crate::version::error::LookupError;
    use crate::version::source::{MockVersionSource, StaticVersionSource};
    use mockall::predicate::eq;

    const ROOT: &str = "/repo/package.json";
    const WORKSPACE_FILE: &str = "/repo/pnpm-workspace.yaml";
    const WEB: &str = "/repo/apps/web/package.json";

    fn layout() -> WorkspaceLayout {
        WorkspaceLayout {
            root_manifest: Some(PathBuf::from(ROOT)),
            workspace_file: Some(PathBuf::from(WORKSPACE_FILE)),
            members: vec![PathBuf::from(WEB)],
        }
    }

    fn mock_files(files: &'static [(&'static str, &'static str)]) -> MockFileStore {
        let mut store = MockFileStore::new();
        for (path, content) in files {
            store
                .expect_read()
                .with(eq(Path::new(path)))
                .times(1)
                .returning(move |_| Ok(content.to_string()));
        }
        store
    }

    #[tokio::test]
    async fn run_writes_each_target_file_exactly_once() {
        let mut files = mock_files(&[
            (ROOT, r#"{"name": "root", "devDependencies": {"typescript": "~5.3.0"}}"#),
            (
                WORKSPACE_FILE,
                "catalogs:\n  web:\n    axios: 1.0.0\n  mobile:\n    zod: 3.0.0\n",
            ),
            (
                WEB,
                r#"{"name": "web", "dependencies": {"axios": "catalog:web", "zod": "catalog:mobile"}}"#,
            ),
        ]);
        files
            .expect_write()
            .with(
                eq(Path::new(WORKSPACE_FILE)),
                eq("catalogs:\n  web:\n    axios: 1.2.0\n  mobile:\n    zod: 3.1.0\n"),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        files
            .expect_write()
            .with(
                eq(Path::new(ROOT)),
                eq(r#"{"name": "root", "devDependencies": {"typescript": "~5.4.0"}}"#),
            )
            .times(1)
            .returning(|_, _| Ok(()));

        let versions: StaticVersionSource = [
            ("axios", "1.2.0"),
            ("zod", "3.1.0"),
            ("typescript", "~5.4.0"),
        ]
        .into_iter()
        .collect();

        let orchestrator = UpgradeOrchestrator::new(files, versions, UpgradeConfig::default());
        let report = orchestrator.run(&layout()).await.unwrap();

        assert_eq!(report.patched().count(), 2);
        assert!(!report.has_failures());
        assert!(matches!(
            report.file(Path::new(WEB)).map(|o| &o.status),
            Some(FileStatus::Unchanged)
        ));
    }

    #[tokio::test]
    async fn run_with_invalid_filter_reads_nothing() {
        let files = MockFileStore::new();
        let versions = MockVersionSource::new();
        let config = UpgradeConfig {
            exclude: Some("/[/".to_string()),
            ..Default::default()
        };

        let result = UpgradeOrchestrator::new(files, versions, config)
            .run(&layout())
            .await;

        assert!(matches!(result, Err(UpgradeError::Config(_))));
    }

    #[tokio::test]
    async fn failed_lookup_only_drops_its_name() {
        let mut files = mock_files(&[
            (ROOT, r#"{"dependencies": {"react": "^17.0.0", "vue": "^3.0.0"}}"#),
        ]);
        files
            .expect_write()
            .with(
                eq(Path::new(ROOT)),
                eq(r#"{"dependencies": {"react": "^18.0.0", "vue": "^3.0.0"}}"#),
            )
            .times(1)
            .returning(|_, _| Ok(()));

        let mut versions = MockVersionSource::new();
        versions
            .expect_desired_version()
            .with(eq("react"))
            .returning(|_| Ok(Some("^18.0.0".to_string())));
        versions
            .expect_desired_version()
            .with(eq("vue"))
            .returning(|name| {
                Err(LookupError::Failed {
                    name: name.to_string(),
                    message: "timeout".to_string(),
                })
            });

        let layout = WorkspaceLayout {
            root_manifest: Some(PathBuf::from(ROOT)),
            ..Default::default()
        };
        let report = UpgradeOrchestrator::new(files, versions, UpgradeConfig::default())
            .run(&layout)
            .await
            .unwrap();

        assert_eq!(report.edits.len(), 1);
        assert_eq!(report.edits[0].dependency, "react");
    }

    #[tokio::test]
    async fn dry_run_never_writes() {
        // No write expectation: any write call fails the test
        let files = mock_files(&[(ROOT, r#"{"dependencies": {"react": "^17.0.0"}}"#)]);
        let versions: StaticVersionSource = [("react", "^18.0.0")].into_iter().collect();
        let config = UpgradeConfig {
            dry_run: true,
            ..Default::default()
        };
        let layout = WorkspaceLayout {
            root_manifest: Some(PathBuf::from(ROOT)),
            ..Default::default()
        };

        let report = UpgradeOrchestrator::new(files, versions, config)
            .run(&layout)
            .await
            .unwrap();

        let outcome = report.file(Path::new(ROOT)).unwrap();
        assert_eq!(
            outcome.content.as_deref(),
            Some(r#"{"dependencies": {"react": "^18.0.0"}}"#)
        );
    }

    #[tokio::test]
    async fn keep_range_prefix_reuses_current_operator() {
        let mut files = mock_files(&[(ROOT, r#"{"dependencies": {"react": "~17.0.0"}}"#)]);
        files
            .expect_write()
            .with(eq(Path::new(ROOT)), eq(r#"{"dependencies": {"react": "~18.2.0"}}"#))
            .times(1)
            .returning(|_, _| Ok(()));
        let versions: StaticVersionSource = [("react", "18.2.0")].into_iter().collect();
        let config = UpgradeConfig {
            keep_range_prefix: true,
            ..Default::default()
        };
        let layout = WorkspaceLayout {
            root_manifest: Some(PathBuf::from(ROOT)),
            ..Default::default()
        };

        let report = UpgradeOrchestrator::new(files, versions, config)
            .run(&layout)
            .await
            .unwrap();

        assert_eq!(report.patched().count(), 1);
    }

    #[test]
    fn edit_plan_keeps_first_of_conflicting_edits() {
        let identity = FileIdentity::File(PathBuf::from(ROOT));
        let mut plan = EditPlan::default();
        plan.push(EditOperation::manifest(identity.clone(), "react", &[], "17.0.0", "18.0.0"));
        plan.push(EditOperation::manifest(identity.clone(), "react", &[], "17.0.0", "19.0.0"));
        plan.push(EditOperation::catalog(identity, "react", "", "17.0.0", "19.0.0"));

        let news: Vec<&str> = plan.operations.iter().map(|op| op.new.as_str()).collect();
        assert_eq!(news, vec!["18.0.0", "19.0.0"]);
    }

    #[test]
    fn group_by_file_merges_catalog_slices_of_one_file() {
        let file = PathBuf::from(WORKSPACE_FILE);
        let edits = vec![
            EditOperation::catalog(
                FileIdentity::CatalogSlice {
                    file: file.clone(),
                    catalog: "web".to_string(),
                },
                "axios",
                "web",
                "1.0.0",
                "1.2.0",
            ),
            EditOperation::manifest(
                FileIdentity::File(PathBuf::from(ROOT)),
                "react",
                &[],
                "1",
                "2",
            ),
            EditOperation::catalog(
                FileIdentity::CatalogSlice {
                    file: file.clone(),
                    catalog: "mobile".to_string(),
                },
                "axios",
                "mobile",
                "1.0.0",
                "1.2.0",
            ),
        ];

        let groups = group_by_file(&edits);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&file].len(), 2);
    }
}
