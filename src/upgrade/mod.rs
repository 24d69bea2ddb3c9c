//! Upgrade run
//! - layout.rs: Already discovered workspace files and their roles
//! - store.rs: File reading and writing collaborator
//! - orchestrator.rs: One run from collection to persistence
//! - report.rs: Per-file outcomes
//! - error.rs: Per-file and fatal errors

pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod report;
pub mod store;

pub use error::UpgradeError;
pub use layout::{FileRole, WorkspaceLayout};
pub use orchestrator::{UpgradeOrchestrator, UpgradePhase};
pub use report::{FileOutcome, FileStatus, UpgradeReport};
pub use store::{DiskStore, FileStore};
