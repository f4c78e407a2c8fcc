use anyhow::{Context, Result, bail};
use regex::Regex;
use std::time::Duration;

/// Immutable retention configuration, validated on construction.
///
/// A zero `age` disables the age check; a missing `version_match`
/// matches every version. At least one of the two must be configured,
/// otherwise a run would delete every version of every listed package.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub organization: String,
    pub package_type: String,
    pub package_names: Vec<String>,
    pub age: Duration,
    pub version_match: Option<Regex>,
    pub dry_run: bool,
    pub registry_host: String,
}

impl RetentionPolicy {
    pub fn new(
        organization: &str,
        package_type: &str,
        package_names: Vec<String>,
        age: Duration,
        version_match: Option<&str>,
        dry_run: bool,
    ) -> Result<Self> {
        if organization.is_empty() {
            bail!("missing parameter 'org-name'");
        }

        if package_type.is_empty() {
            bail!("missing parameter 'package-type'");
        }

        if package_names.is_empty() {
            bail!("at least one package name must be given");
        }

        if age.is_zero() && version_match.is_none() {
            bail!("neither parameter 'age' nor 'version-match' set");
        }

        let version_match = version_match
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("Invalid version match pattern '{}'", pattern))
            })
            .transpose()?;

        Ok(Self {
            // Container repositories are always lower case.
            organization: organization.to_lowercase(),
            package_type: package_type.to_string(),
            package_names,
            age,
            version_match,
            dry_run,
            registry_host: "ghcr.io".to_string(),
        })
    }

    /// Overrides the registry host used to build image references.
    pub fn with_registry_host(mut self, registry_host: &str) -> Self {
        self.registry_host = registry_host.to_string();
        self
    }
}
