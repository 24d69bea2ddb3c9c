//! Filesystem collaborator

use std::io;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

/// Trait for reading and persisting target files
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Reads the whole file as UTF-8
    async fn read(&self, path: &Path) -> io::Result<String>;

    /// Replaces the file content
    async fn write(&self, path: &Path, content: &str) -> io::Result<()>;
}

/// File store backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

#[async_trait::async_trait]
impl FileStore for DiskStore {
    async fn read(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        tokio::fs::write(path, content).await
    }
}
