use anyhow::{Result, anyhow};
use std::str::FromStr;

/// A tagged image reference of the form `<registry-host>/<org>/<package>:<tag>`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn new(registry: &str, org: &str, package_name: &str, tag: &str) -> Self {
        Self {
            registry: registry.to_string(),
            repository: format!("{}/{}", org, package_name),
            tag: tag.to_string(),
        }
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

impl FromStr for ImageReference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, tag) = s
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("Invalid image reference '{}'. Expected 'host/repo:tag'.", s))?;

        let (registry, repository) = name
            .split_once('/')
            .ok_or_else(|| anyhow!("Invalid image reference '{}'. Expected 'host/repo:tag'.", s))?;

        if registry.is_empty() || repository.is_empty() || tag.is_empty() {
            return Err(anyhow!(
                "Invalid image reference '{}'. Expected 'host/repo:tag'.",
                s
            ));
        }

        Ok(ImageReference {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }
}
