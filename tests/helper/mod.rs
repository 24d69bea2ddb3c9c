#![allow(dead_code)]

mod source;
mod store;

pub use source::FlakySource;
pub use store::MemoryStore;

use catalog_bump::config::UpgradeConfig;
use catalog_bump::upgrade::{UpgradeOrchestrator, UpgradeReport, WorkspaceLayout};
use catalog_bump::version::StaticVersionSource;

pub const ROOT: &str = "/repo/package.json";
pub const WORKSPACE_FILE: &str = "/repo/pnpm-workspace.yaml";
pub const WEB: &str = "/repo/apps/web/package.json";
pub const MOBILE: &str = "/repo/apps/mobile/package.json";

/// Layout with every fixture path that `store` knows about
pub fn layout_for(store: &MemoryStore) -> WorkspaceLayout {
    let has = |path: &str| store.contains(path);
    WorkspaceLayout {
        root_manifest: has(ROOT).then(|| ROOT.into()),
        workspace_file: has(WORKSPACE_FILE).then(|| WORKSPACE_FILE.into()),
        members: [WEB, MOBILE]
            .into_iter()
            .filter(|path| has(*path))
            .map(Into::into)
            .collect(),
    }
}

/// Run one upgrade with a static desired-version map
pub async fn run_upgrade(
    store: &MemoryStore,
    layout: &WorkspaceLayout,
    desired: &[(&str, &str)],
    config: UpgradeConfig,
) -> UpgradeReport {
    let versions: StaticVersionSource = desired.iter().copied().collect();
    UpgradeOrchestrator::new(store.clone(), versions, config)
        .run(layout)
        .await
        .unwrap()
}
