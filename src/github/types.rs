use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One version of an organization package, as returned by
/// `GET /orgs/{org}/packages/{package_type}/{package_name}/versions`.
///
/// For container packages `name` is either a tag or, for manifests only
/// reachable by digest, a `sha256:<hex>` string. `updated_at` may be
/// absent; such versions have an unknown age.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PackageVersion {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<PackageMetadata>,
}

impl PackageVersion {
    /// Tags carried by a container version, empty for other package
    /// types or when the container metadata object is missing.
    pub fn tags(&self) -> &[String] {
        self.metadata
            .as_ref()
            .and_then(|m| m.container.as_ref())
            .map(|c| c.tags.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PackageMetadata {
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub container: Option<ContainerMetadata>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ContainerMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
}
