//! Desired-version collaborator

use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;

use crate::version::error::LookupError;

/// Trait for obtaining the version a dependency should be upgraded to
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionSource: Send + Sync {
    /// Desired version spec for `package_name`
    ///
    /// # Returns
    /// * `Ok(Some(spec))` - The spec the dependency should be rewritten to
    /// * `Ok(None)` - No upgrade available
    /// * `Err(LookupError)` - The lookup failed; treated like `Ok(None)` by callers
    async fn desired_version(&self, package_name: &str) -> Result<Option<String>, LookupError>;
}

/// Version source backed by an already resolved name -> spec map
#[derive(Debug, Clone, Default)]
pub struct StaticVersionSource {
    versions: HashMap<String, String>,
}

impl StaticVersionSource {
    pub fn new(versions: HashMap<String, String>) -> Self {
        Self { versions }
    }
}

impl<K, V> FromIterator<(K, V)> for StaticVersionSource
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, spec)| (name.into(), spec.into()))
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl VersionSource for StaticVersionSource {
    async fn desired_version(&self, package_name: &str) -> Result<Option<String>, LookupError> {
        Ok(self.versions.get(package_name).cloned())
    }
}
