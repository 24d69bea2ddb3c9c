use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use catalog_bump::config::{self, DEFAULT_LOG_FILTER, UpgradeConfig};
use catalog_bump::upgrade::{DiskStore, UpgradeOrchestrator, WorkspaceLayout};
use catalog_bump::version::StaticVersionSource;
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-bump")]
#[command(
    version,
    about = "Rewrite dependency versions across a workspace, catalogs included"
)]
struct Cli {
    /// Upgrade plan (JSON): workspace files, desired versions and options
    plan: PathBuf,

    /// Compute patched content without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Log file (defaults to the data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Input of one run
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Plan {
    #[serde(flatten)]
    layout: WorkspaceLayout,
    /// Dependency name -> desired spec
    #[serde(default)]
    desired: HashMap<String, String>,
    #[serde(default)]
    config: UpgradeConfig,
}

fn init_logging(log_file: Option<PathBuf>) -> anyhow::Result<WorkerGuard> {
    let path = log_file.unwrap_or_else(config::log_path);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .context("Log file path has no file name")?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        dir, file_name,
    ));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();

    Ok(guard)
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let text = tokio::fs::read_to_string(&cli.plan)
        .await
        .with_context(|| format!("Failed to read plan {}", cli.plan.display()))?;
    let mut plan: Plan = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse plan {}", cli.plan.display()))?;
    plan.config.dry_run |= cli.dry_run;

    info!("Starting upgrade from {}", cli.plan.display());
    let versions: StaticVersionSource = plan.desired.into_iter().collect();
    let orchestrator = UpgradeOrchestrator::new(DiskStore, versions, plan.config);
    let report = orchestrator.run(&plan.layout).await?;

    print!("{report}");
    Ok(!report.has_failures())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.clone())?;

    let succeeded = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))?;

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
