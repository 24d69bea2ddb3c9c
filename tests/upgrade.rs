//! Upgrade run E2E tests

mod helper;

use std::path::Path;

use catalog_bump::config::UpgradeConfig;
use catalog_bump::upgrade::{
    DiskStore, FileStatus, UpgradeError, UpgradeOrchestrator, WorkspaceLayout,
};
use catalog_bump::version::StaticVersionSource;
use tempfile::TempDir;

use helper::{FlakySource, MOBILE, MemoryStore, ROOT, WEB, WORKSPACE_FILE, layout_for, run_upgrade};

#[tokio::test]
async fn lowest_declared_spec_is_the_edit_baseline() {
    let store = MemoryStore::with_files([(
        ROOT,
        r#"{"dependencies": {"foo": "^3.0.0"}, "devDependencies": {"foo": "^2.1.0"}}"#,
    )]);

    let report = run_upgrade(
        &store,
        &layout_for(&store),
        &[("foo", "^4.0.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert_eq!(report.edits.len(), 1);
    assert_eq!(report.edits[0].old, "^2.1.0");
    assert_eq!(
        store.content(ROOT),
        r#"{"dependencies": {"foo": "^3.0.0"}, "devDependencies": {"foo": "^4.0.0"}}"#
    );
}

#[tokio::test]
async fn links_and_non_registry_sources_survive_an_upgrade() {
    let root = r#"{
  "dependencies": {"foo": "workspace:^", "react": "^17.0.0"},
  "devDependencies": {"foo": "^1.0.0"},
  "optionalDependencies": {"bar": "github:user/bar#v1"},
  "overrides": {"react": "$react"}
}"#;
    let store = MemoryStore::with_files([(ROOT, root)]);

    let report = run_upgrade(
        &store,
        &layout_for(&store),
        &[("foo", "^2.0.0"), ("react", "^18.0.0"), ("bar", "^2.0.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert!(!report.has_failures());
    assert_eq!(
        store.content(ROOT),
        r#"{
  "dependencies": {"foo": "workspace:^", "react": "^18.0.0"},
  "devDependencies": {"foo": "^2.0.0"},
  "optionalDependencies": {"bar": "github:user/bar#v1"},
  "overrides": {"react": "$react"}
}"#
    );
}

#[tokio::test]
async fn catalog_references_are_never_edited_directly() {
    let consumer = r#"{"dependencies": {"lodash": "catalog:", "axios": "catalog:web"}}"#;
    let store = MemoryStore::with_files([(WEB, consumer)]);

    let report = run_upgrade(
        &store,
        &layout_for(&store),
        &[("lodash", "4.17.21"), ("axios", "1.2.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert!(report.edits.is_empty());
    assert_eq!(store.content(WEB), consumer);
    assert_eq!(store.total_writes(), 0);
}

#[tokio::test]
async fn catalog_definition_is_rewritten_and_consumer_left_alone() {
    let consumer = r#"{"name": "web", "dependencies": {"lodash": "catalog:"}}"#;
    let store = MemoryStore::with_files([
        (WORKSPACE_FILE, "packages:\n  - apps/*\ncatalog:\n  lodash: \"4.17.20\"\n"),
        (WEB, consumer),
    ]);

    let report = run_upgrade(
        &store,
        &layout_for(&store),
        &[("lodash", "4.17.21")],
        UpgradeConfig::default(),
    )
    .await;

    assert!(!report.has_failures());
    assert_eq!(
        store.content(WORKSPACE_FILE),
        "packages:\n  - apps/*\ncatalog:\n  lodash: \"4.17.21\"\n"
    );
    assert_eq!(store.content(WEB), consumer);
    assert_eq!(store.writes(WEB), 0);
}

#[tokio::test]
async fn dependency_and_override_are_updated_together() {
    let store = MemoryStore::with_files([(
        ROOT,
        r#"{
  "dependencies": {
    "react": "^17.0.0"
  },
  "overrides": {
    "react": "^17.0.0"
  }
}
"#,
    )]);

    run_upgrade(
        &store,
        &layout_for(&store),
        &[("react", "^18.0.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert_eq!(
        store.content(ROOT),
        r#"{
  "dependencies": {
    "react": "^18.0.0"
  },
  "overrides": {
    "react": "^18.0.0"
  }
}
"#
    );
}

#[tokio::test]
async fn only_referenced_named_catalog_is_rewritten() {
    let store = MemoryStore::with_files([
        (
            WORKSPACE_FILE,
            r#"catalogs:
  # phones and tablets
  mobile:
    axios: 1.0.0
  web:
    axios: 1.0.0
    zod: 3.22.0
"#,
        ),
        (MOBILE, r#"{"dependencies": {"axios": "catalog:mobile"}}"#),
    ]);

    run_upgrade(
        &store,
        &layout_for(&store),
        &[("axios", "1.2.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert_eq!(
        store.content(WORKSPACE_FILE),
        r#"catalogs:
  # phones and tablets
  mobile:
    axios: 1.2.0
  web:
    axios: 1.0.0
    zod: 3.22.0
"#
    );
}

#[tokio::test]
async fn flat_and_nested_catalogs_in_root_manifest_are_updated_together() {
    let root = r#"{
  "name": "monorepo",
  "catalog": {
    "foo": "1.0.0"
  },
  "workspaces": {
    "packages": ["apps/*"],
    "catalog": {
      "foo": "1.0.0"
    }
  }
}"#;
    let store = MemoryStore::with_files([
        (ROOT, root),
        (WEB, r#"{"dependencies": {"foo": "catalog:"}}"#),
    ]);

    run_upgrade(
        &store,
        &layout_for(&store),
        &[("foo", "2.0.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert_eq!(store.content(ROOT), root.replace("1.0.0", "2.0.0"));
    assert_eq!(store.writes(ROOT), 1);
}

#[tokio::test]
async fn catalog_file_is_read_and_written_once_for_many_catalogs() {
    let store = MemoryStore::with_files([
        (
            WORKSPACE_FILE,
            "catalog:\n  react: ^18.0.0\ncatalogs:\n  web:\n    axios: 1.0.0\n  mobile:\n    axios: 1.0.0\n    zod: 3.0.0\n",
        ),
        (WEB, r#"{"dependencies": {"react": "catalog:", "axios": "catalog:web"}}"#),
        (MOBILE, r#"{"dependencies": {"axios": "catalog:mobile", "zod": "catalog:mobile"}}"#),
    ]);

    let report = run_upgrade(
        &store,
        &layout_for(&store),
        &[("react", "^18.3.1"), ("axios", "1.2.0"), ("zod", "3.1.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert_eq!(report.edits.len(), 4);
    assert_eq!(store.reads(WORKSPACE_FILE), 1);
    assert_eq!(store.writes(WORKSPACE_FILE), 1);
    assert_eq!(
        store.content(WORKSPACE_FILE),
        "catalog:\n  react: ^18.3.1\ncatalogs:\n  web:\n    axios: 1.2.0\n  mobile:\n    axios: 1.2.0\n    zod: 3.1.0\n"
    );
}

#[tokio::test]
async fn second_run_produces_no_writes() {
    let store = MemoryStore::with_files([
        (WORKSPACE_FILE, "catalog:\n  lodash: 4.17.20 # pinned\n"),
        (
            WEB,
            r#"{"dependencies": {"lodash": "catalog:", "react": "^17.0.0"}, "overrides": {"react": "^17.0.0"}}"#,
        ),
    ]);
    let desired = [("lodash", "4.17.21"), ("react", "^18.0.0")];

    run_upgrade(&store, &layout_for(&store), &desired, UpgradeConfig::default()).await;
    let first_workspace = store.content(WORKSPACE_FILE);
    let first_web = store.content(WEB);
    let writes = store.total_writes();

    let report = run_upgrade(&store, &layout_for(&store), &desired, UpgradeConfig::default()).await;

    assert!(report.edits.is_empty());
    assert_eq!(report.patched().count(), 0);
    assert_eq!(store.total_writes(), writes);
    assert_eq!(store.content(WORKSPACE_FILE), first_workspace);
    assert_eq!(store.content(WEB), first_web);
}

#[tokio::test]
async fn desired_equal_to_current_changes_nothing() {
    let root = r#"{"packageManager": "pnpm@9.1.0+sha512.abc", "dependencies": {"react": "^18.0.0"}}"#;
    let store = MemoryStore::with_files([(ROOT, root)]);

    let report = run_upgrade(
        &store,
        &layout_for(&store),
        &[("react", "^18.0.0"), ("pnpm", "9.1.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert!(report.edits.is_empty());
    assert_eq!(store.content(ROOT), root);
    assert_eq!(store.total_writes(), 0);
}

#[tokio::test]
async fn broken_catalog_file_does_not_block_other_manifests() {
    let broken = "catalog:\n  lodash: [4.17.20\n";
    let store = MemoryStore::with_files([
        (WORKSPACE_FILE, broken),
        (WEB, r#"{"dependencies": {"lodash": "catalog:", "react": "^17.0.0"}}"#),
    ]);

    let report = run_upgrade(
        &store,
        &layout_for(&store),
        &[("lodash", "4.17.21"), ("react", "^18.0.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert!(matches!(
        report.file(Path::new(WORKSPACE_FILE)).map(|o| &o.status),
        Some(FileStatus::Failed(UpgradeError::Parse { .. }))
    ));
    assert_eq!(store.content(WORKSPACE_FILE), broken);
    assert_eq!(
        store.content(WEB),
        r#"{"dependencies": {"lodash": "catalog:", "react": "^18.0.0"}}"#
    );
}

#[tokio::test]
async fn unreadable_and_unsupported_files_are_reported_per_file() {
    let store = MemoryStore::with_files([(WEB, r#"{"dependencies": {"react": "^17.0.0"}}"#)]);
    let layout = WorkspaceLayout {
        root_manifest: Some(ROOT.into()),
        workspace_file: Some("/repo/pnpm-workspace.toml".into()),
        members: vec![WEB.into()],
    };

    let report = run_upgrade(
        &store,
        &layout,
        &[("react", "^18.0.0")],
        UpgradeConfig::default(),
    )
    .await;

    assert!(matches!(
        report.file(Path::new(ROOT)).map(|o| &o.status),
        Some(FileStatus::Failed(UpgradeError::Read { .. }))
    ));
    assert!(matches!(
        report.file(Path::new("/repo/pnpm-workspace.toml")).map(|o| &o.status),
        Some(FileStatus::Failed(UpgradeError::UnsupportedFormat { .. }))
    ));
    assert_eq!(store.content(WEB), r#"{"dependencies": {"react": "^18.0.0"}}"#);
}

#[tokio::test]
async fn failed_lookup_only_skips_that_dependency() {
    let store = MemoryStore::with_files([(
        ROOT,
        r#"{"dependencies": {"react": "^17.0.0", "vue": "^2.7.0"}}"#,
    )]);
    let source = FlakySource::new(&[("react", "^18.0.0"), ("vue", "^3.4.0")], &["vue"]);

    let report = UpgradeOrchestrator::new(store.clone(), source, UpgradeConfig::default())
        .run(&layout_for(&store))
        .await
        .unwrap();

    assert!(!report.has_failures());
    assert_eq!(
        store.content(ROOT),
        r#"{"dependencies": {"react": "^18.0.0", "vue": "^2.7.0"}}"#
    );
}

#[tokio::test]
async fn malformed_filter_aborts_before_reading() {
    let store = MemoryStore::with_files([(ROOT, r#"{"dependencies": {"react": "^17.0.0"}}"#)]);
    let config = UpgradeConfig {
        include: Some("/[/".to_string()),
        ..Default::default()
    };
    let versions: StaticVersionSource = [("react", "^18.0.0")].into_iter().collect();

    let result = UpgradeOrchestrator::new(store.clone(), versions, config)
        .run(&layout_for(&store))
        .await;

    assert!(matches!(result, Err(UpgradeError::Config(_))));
    assert_eq!(store.total_reads(), 0);
}

#[tokio::test]
async fn workspace_packages_and_excluded_names_are_kept() {
    let root = r#"{"name": "root", "dependencies": {"@acme/ui": "^1.0.0", "typescript": "~5.3.0", "react": "^17.0.0"}}"#;
    let store = MemoryStore::with_files([
        (ROOT, root),
        (WEB, r#"{"name": "@acme/ui", "version": "1.0.0"}"#),
    ]);
    let config = UpgradeConfig {
        exclude: Some("typescript".to_string()),
        ..Default::default()
    };

    run_upgrade(
        &store,
        &layout_for(&store),
        &[("@acme/ui", "^2.0.0"), ("typescript", "~5.4.0"), ("react", "^18.0.0")],
        config,
    )
    .await;

    assert_eq!(
        store.content(ROOT),
        r#"{"name": "root", "dependencies": {"@acme/ui": "^1.0.0", "typescript": "~5.3.0", "react": "^18.0.0"}}"#
    );
}

#[tokio::test]
async fn version_filter_applies_to_manifests_and_catalogs() {
    let store = MemoryStore::with_files([
        (WORKSPACE_FILE, "catalog:\n  zod: ^0.9.0\n  axios: ^1.6.0\n"),
        (
            WEB,
            r#"{"dependencies": {"zod": "catalog:", "axios": "catalog:", "vite": "^0.8.0", "react": "^17.0.0"}}"#,
        ),
    ]);
    let config = UpgradeConfig {
        exclude_version: Some("^0.*".to_string()),
        ..Default::default()
    };

    run_upgrade(
        &store,
        &layout_for(&store),
        &[("zod", "^3.0.0"), ("axios", "^1.7.0"), ("vite", "^5.0.0"), ("react", "^18.0.0")],
        config,
    )
    .await;

    assert_eq!(store.content(WORKSPACE_FILE), "catalog:\n  zod: ^0.9.0\n  axios: ^1.7.0\n");
    assert_eq!(
        store.content(WEB),
        r#"{"dependencies": {"zod": "catalog:", "axios": "catalog:", "vite": "^0.8.0", "react": "^18.0.0"}}"#
    );
}

#[tokio::test]
async fn malformed_version_filter_aborts_before_reading() {
    let store = MemoryStore::with_files([(ROOT, r#"{"dependencies": {"react": "^17.0.0"}}"#)]);
    let config = UpgradeConfig {
        include_version: Some("/(/".to_string()),
        ..Default::default()
    };

    let result = UpgradeOrchestrator::new(store.clone(), StaticVersionSource::default(), config)
        .run(&layout_for(&store))
        .await;

    assert!(matches!(result, Err(UpgradeError::Config(_))));
    assert_eq!(store.total_reads(), 0);
}

#[tokio::test]
async fn dry_run_reports_content_without_writing() {
    let store = MemoryStore::with_files([
        (WORKSPACE_FILE, "catalog:\n  lodash: 4.17.20\n"),
        (WEB, r#"{"dependencies": {"lodash": "catalog:"}}"#),
    ]);
    let config = UpgradeConfig {
        dry_run: true,
        ..Default::default()
    };

    let report = run_upgrade(&store, &layout_for(&store), &[("lodash", "4.17.21")], config).await;

    assert_eq!(store.total_writes(), 0);
    let outcome = report.file(Path::new(WORKSPACE_FILE)).unwrap();
    assert_eq!(outcome.content.as_deref(), Some("catalog:\n  lodash: 4.17.21\n"));
    assert!(report.to_string().contains("would patch /repo/pnpm-workspace.yaml"));
}

#[tokio::test]
async fn disk_store_patches_files_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let workspace_file = temp_dir.path().join("pnpm-workspace.yaml");
    let member = temp_dir.path().join("package.json");
    std::fs::write(
        &workspace_file,
        "packages:\n  - '.'\n\ncatalogs:\n  web:\n    # http client\n    axios: ^1.6.0\n",
    )
    .unwrap();
    std::fs::write(
        &member,
        "{\n  \"dependencies\": {\n    \"axios\": \"catalog:web\"\n  }\n}\n",
    )
    .unwrap();

    let layout = WorkspaceLayout {
        root_manifest: Some(member.clone()),
        workspace_file: Some(workspace_file.clone()),
        members: Vec::new(),
    };
    let versions: StaticVersionSource = [("axios", "^1.7.2")].into_iter().collect();
    let report = UpgradeOrchestrator::new(DiskStore, versions, UpgradeConfig::default())
        .run(&layout)
        .await
        .unwrap();

    assert!(!report.has_failures());
    assert_eq!(
        std::fs::read_to_string(&workspace_file).unwrap(),
        "packages:\n  - '.'\n\ncatalogs:\n  web:\n    # http client\n    axios: ^1.7.2\n"
    );
    assert_eq!(
        std::fs::read_to_string(&member).unwrap(),
        "{\n  \"dependencies\": {\n    \"axios\": \"catalog:web\"\n  }\n}\n"
    );
}
