use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use url::Url;

use super::types::PackageVersion;
use crate::http::HttpClient;

/// Page size for version listing requests.
const PER_PAGE: usize = 100;

/// Capability for listing and deleting organization package versions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Returns every version of the package, following pagination to
    /// the end before returning.
    async fn list_all_versions(
        &self,
        org: &str,
        package_type: &str,
        package_name: &str,
    ) -> Result<Vec<PackageVersion>>;

    /// Deletes a single package version by its registry id.
    async fn delete_version(
        &self,
        org: &str,
        package_type: &str,
        package_name: &str,
        id: i64,
    ) -> Result<()>;
}

/// GitHub packages API client.
pub struct GitHubPackages {
    http: HttpClient,
    api_url: String,
}

impl GitHubPackages {
    #[tracing::instrument(skip(client, api_url))]
    pub fn new(client: reqwest::Client, api_url: Option<String>) -> Self {
        let api_url = api_url.unwrap_or_else(|| "https://api.github.com".to_string());
        Self {
            http: HttpClient::new(client),
            api_url,
        }
    }

    /// Builds `<api_url>/orgs/{org}/packages/{type}/{name}/versions[/{id}]`,
    /// percent-escaping each path segment (package names may contain `/`).
    fn versions_url(
        &self,
        org: &str,
        package_type: &str,
        package_name: &str,
        id: Option<i64>,
    ) -> Result<String> {
        let mut url = Url::parse(&self.api_url).context("Invalid GitHub API URL")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("GitHub API URL cannot be a base"))?;
            segments
                .pop_if_empty()
                .extend(["orgs", org, "packages", package_type, package_name, "versions"]);
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }
        Ok(url.into())
    }
}

#[async_trait]
impl PackageRegistry for GitHubPackages {
    #[tracing::instrument(skip(self))]
    async fn list_all_versions(
        &self,
        org: &str,
        package_type: &str,
        package_name: &str,
    ) -> Result<Vec<PackageVersion>> {
        let url = self.versions_url(org, package_type, package_name, None)?;

        let mut versions = Vec::new();
        let mut page = 1usize;

        loop {
            debug!("Fetching versions page {} from {}...", page, url);

            let batch: Vec<PackageVersion> = self
                .http
                .get_json_with_query(
                    &url,
                    &[("per_page", &PER_PAGE.to_string()), ("page", &page.to_string())],
                )
                .await
                .with_context(|| format!("Failed to list versions of package {}", package_name))?;

            if batch.is_empty() {
                break;
            }

            let len = batch.len();
            versions.extend(batch);

            if len < PER_PAGE {
                break;
            }

            page += 1;
        }

        Ok(versions)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_version(
        &self,
        org: &str,
        package_type: &str,
        package_name: &str,
        id: i64,
    ) -> Result<()> {
        let url = self.versions_url(org, package_type, package_name, Some(id))?;

        self.http.delete(&url).await.with_context(|| {
            format!("Failed to delete version {} of package {}", id, package_name)
        })
    }
}
