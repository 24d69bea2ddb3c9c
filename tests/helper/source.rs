//! Version source test utilities

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use catalog_bump::version::{LookupError, VersionSource};

/// Version source whose lookups fail for selected names
pub struct FlakySource {
    versions: HashMap<String, String>,
    failing: HashSet<String>,
}

impl FlakySource {
    pub fn new(versions: &[(&str, &str)], failing: &[&str]) -> Self {
        Self {
            versions: versions
                .iter()
                .map(|(name, spec)| (name.to_string(), spec.to_string()))
                .collect(),
            failing: failing.iter().map(|name| name.to_string()).collect(),
        }
    }
}

#[async_trait]
impl VersionSource for FlakySource {
    async fn desired_version(&self, package_name: &str) -> Result<Option<String>, LookupError> {
        if self.failing.contains(package_name) {
            return Err(LookupError::Failed {
                name: package_name.to_string(),
                message: "registry unavailable".to_string(),
            });
        }
        Ok(self.versions.get(package_name).cloned())
    }
}
